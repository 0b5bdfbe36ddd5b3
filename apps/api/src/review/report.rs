//! Final score report: data model, best-effort extraction, aggregate scoring.
//!
//! The extraction stage asks the model for strict JSON, but replies routinely
//! arrive wrapped in code fences, prefixed with commentary, or cut off. The
//! extractor runs an ordered list of parse attempts instead of nested error
//! handling, and always returns a report with `meta`, `scores`, and
//! `aggregate` present so downstream consumers never branch on absence.

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// First brace-delimited substring, spanning newlines, greedy to the last
/// closing brace.
static EMBEDDED_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_review_time")]
    pub review_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_analysis: Option<String>,
}

impl Default for ReportMeta {
    fn default() -> Self {
        Self {
            title: default_title(),
            version: default_version(),
            review_time: default_review_time(),
            policy_analysis: None,
        }
    }
}

fn default_title() -> String {
    "综合评估结果".to_string()
}

fn default_version() -> String {
    "v1.0".to_string()
}

fn default_review_time() -> String {
    Local::now().to_rfc3339()
}

/// One scored dimension. Weights are fixed per dimension (15/30/20/20/15)
/// and come back from the model alongside the 1–5 score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DimensionScore {
    #[serde(default)]
    pub dimension: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub score_1_to_5: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregate {
    #[serde(default)]
    pub weighted_total_100: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub priority_fixes_top5: Vec<String>,
}

impl Default for Aggregate {
    /// Backfill used when the model reply had no `aggregate` key at all.
    fn default() -> Self {
        Self {
            weighted_total_100: 0.0,
            strengths: vec!["评估结果不完整".to_string()],
            risks: vec!["缺少聚合信息".to_string()],
            priority_fixes_top5: vec!["重新提交评估".to_string()],
        }
    }
}

/// The final structured scoring object returned to the caller.
/// Owned by the pipeline for the duration of one request; never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewReport {
    #[serde(default)]
    pub meta: ReportMeta,
    #[serde(default)]
    pub scores: Vec<DimensionScore>,
    #[serde(default)]
    pub aggregate: Aggregate,
}

impl ReviewReport {
    /// Shell returned when no JSON can be recovered from the model output.
    pub fn extraction_failure() -> Self {
        Self {
            meta: ReportMeta::default(),
            scores: Vec::new(),
            aggregate: Aggregate {
                weighted_total_100: 0.0,
                strengths: vec!["评估过程中出现错误".to_string()],
                risks: vec!["无法解析评估结果".to_string()],
                priority_fixes_top5: vec![
                    "重新提交评估".to_string(),
                    "检查输入内容".to_string(),
                    "联系技术支持".to_string(),
                ],
            },
        }
    }
}

/// Best-effort extraction of the structured report from free-form model text.
///
/// Strategies, in order: strip code fences and parse strictly; parse the
/// first brace-delimited substring; fall back to a placeholder shell.
pub fn extract_report(raw: &str) -> ReviewReport {
    let cleaned = strip_json_fences(raw);
    let report = serde_json::from_str::<ReviewReport>(cleaned)
        .ok()
        .or_else(|| {
            EMBEDDED_OBJECT
                .find(cleaned)
                .and_then(|m| serde_json::from_str(m.as_str()).ok())
        })
        .unwrap_or_else(ReviewReport::extraction_failure);
    normalize(report)
}

/// Recomputes the weighted total when the model left it at zero but did
/// produce per-dimension scores.
fn normalize(mut report: ReviewReport) -> ReviewReport {
    if report.aggregate.weighted_total_100 == 0.0 && !report.scores.is_empty() {
        report.aggregate.weighted_total_100 = weighted_total(&report.scores);
    }
    report
}

/// Weighted total on a 100-point scale: Σ(score_i / 5 × weight_i).
pub fn weighted_total(scores: &[DimensionScore]) -> f64 {
    scores
        .iter()
        .map(|s| s.score_1_to_5 / 5.0 * s.weight)
        .sum()
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_REPORT: &str = r#"{
        "meta": {"title": "国内青年人才申请评估结果", "version": "v1.0", "review_time": "2025-03-01T10:00:00"},
        "scores": [
            {"dimension": "教育、学术与科研工作经历", "weight": 15, "score_1_to_5": 5,
             "evidence": ["世界顶级大学博士"], "issues": [], "suggestion": "保持"},
            {"dimension": "已取得科学研究及技术创新的成果及贡献", "weight": 30, "score_1_to_5": 4,
             "evidence": ["顶级期刊论文"], "issues": ["缺少应用"], "suggestion": "补充应用成果"},
            {"dimension": "学术见解及技术成果独特性和原始创新性评价", "weight": 20, "score_1_to_5": 3,
             "evidence": [], "issues": [], "suggestion": ""},
            {"dimension": "发展潜力的评价", "weight": 20, "score_1_to_5": 4,
             "evidence": [], "issues": [], "suggestion": ""},
            {"dimension": "申请工作设想和国内依托单位支持情况", "weight": 15, "score_1_to_5": 5,
             "evidence": [], "issues": [], "suggestion": ""}
        ],
        "aggregate": {
            "weighted_total_100": 82,
            "strengths": ["s1", "s2", "s3", "s4", "s5"],
            "risks": ["r1", "r2", "r3", "r4", "r5"],
            "priority_fixes_top5": ["f1", "f2", "f3", "f4", "f5"]
        }
    }"#;

    #[test]
    fn test_fenced_json_parses_unchanged() {
        let fenced = format!("```json\n{FULL_REPORT}\n```");
        let report = extract_report(&fenced);
        assert_eq!(report.meta.title, "国内青年人才申请评估结果");
        assert_eq!(report.scores.len(), 5);
        assert_eq!(report.aggregate.weighted_total_100, 82.0);
        assert_eq!(report.aggregate.strengths.len(), 5);
    }

    #[test]
    fn test_bare_fence_without_language_tag() {
        let fenced = format!("```\n{FULL_REPORT}\n```");
        let report = extract_report(&fenced);
        assert_eq!(report.scores.len(), 5);
    }

    #[test]
    fn test_embedded_object_recovered_from_noise() {
        let noisy = format!("以下是评估结果：\n{FULL_REPORT}\n希望对您有帮助。");
        let report = extract_report(&noisy);
        assert_eq!(report.scores.len(), 5);
        assert_eq!(report.aggregate.weighted_total_100, 82.0);
    }

    #[test]
    fn test_unparseable_text_yields_placeholder_shell() {
        let report = extract_report("模型拒绝输出 JSON，只给了一段散文。");
        assert!(report.scores.is_empty());
        assert!(!report.aggregate.strengths.is_empty());
        assert!(!report.aggregate.risks.is_empty());
        assert!(!report.aggregate.priority_fixes_top5.is_empty());
        assert_eq!(report.meta.title, "综合评估结果");
    }

    #[test]
    fn test_missing_keys_are_backfilled() {
        let report = extract_report(r#"{"scores": []}"#);
        assert_eq!(report.meta.version, "v1.0");
        assert!(!report.meta.review_time.is_empty());
        assert_eq!(report.aggregate.strengths, vec!["评估结果不完整"]);
    }

    #[test]
    fn test_weighted_total_with_fixed_weights() {
        let weights = [15.0, 30.0, 20.0, 20.0, 15.0];
        let scores_1_to_5 = [5.0, 4.0, 3.0, 4.0, 5.0];
        let scores: Vec<DimensionScore> = weights
            .iter()
            .zip(scores_1_to_5)
            .map(|(&weight, score)| DimensionScore {
                weight,
                score_1_to_5: score,
                ..Default::default()
            })
            .collect();
        // 15 + 24 + 12 + 16 + 15
        assert!((weighted_total(&scores) - 82.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_total_all_top_scores_is_100() {
        let scores: Vec<DimensionScore> = [15.0, 30.0, 20.0, 20.0, 15.0]
            .iter()
            .map(|&weight| DimensionScore {
                weight,
                score_1_to_5: 5.0,
                ..Default::default()
            })
            .collect();
        assert!((weighted_total(&scores) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_total_recomputed_from_scores() {
        let raw = r#"{
            "scores": [
                {"dimension": "d1", "weight": 15, "score_1_to_5": 5},
                {"dimension": "d2", "weight": 30, "score_1_to_5": 5}
            ],
            "aggregate": {"weighted_total_100": 0, "strengths": [], "risks": [], "priority_fixes_top5": []}
        }"#;
        let report = extract_report(raw);
        assert!((report.aggregate.weighted_total_100 - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_model_supplied_total_is_kept() {
        let raw = r#"{
            "scores": [{"dimension": "d1", "weight": 15, "score_1_to_5": 5}],
            "aggregate": {"weighted_total_100": 60, "strengths": [], "risks": [], "priority_fixes_top5": []}
        }"#;
        let report = extract_report(raw);
        assert_eq!(report.aggregate.weighted_total_100, 60.0);
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        assert_eq!(strip_json_fences("{\"k\": 1}"), "{\"k\": 1}");
    }

    #[test]
    fn test_policy_analysis_absent_until_merged() {
        let report = extract_report(FULL_REPORT);
        assert!(report.meta.policy_analysis.is_none());
        let serialized = serde_json::to_value(&report).expect("serialize");
        assert!(serialized["meta"].get("policy_analysis").is_none());
    }
}
