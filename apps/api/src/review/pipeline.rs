//! Stage Orchestrator — drives the fixed six-stage evaluation sequence.
//!
//! Stages run strictly in order; each stage's stream is fully drained before
//! the next begins. Output flows forward: the synthesis and extraction stages
//! embed the replies of earlier stages in their prompts. Every outcome,
//! including failure, is reported as an event — the transport has already
//! committed to a stream, so there is no response status left to change.

use chrono::Local;
use tracing::{debug, warn};

use crate::llm_client::{ChatOptions, DeltaStream, LlmClient};
use crate::review::chunk::ChunkBuffer;
use crate::review::events::{EventSender, ProgressEvent};
use crate::review::guard;
use crate::review::prompts;
use crate::review::report::extract_report;

/// Fixed per-stage call parameters and wire labels. Later, higher-stakes
/// stages use lower temperatures and larger generation caps.
struct StageSpec {
    round: u8,
    reviewer: &'static str,
    system: &'static str,
    options: ChatOptions,
    start_message: &'static str,
    complete_message: &'static str,
    error_prefix: &'static str,
}

const VALIDATION_STAGE: StageSpec = StageSpec {
    round: 1,
    reviewer: "输入验证专家",
    system: prompts::VALIDATION_SYSTEM,
    options: ChatOptions {
        temperature: 0.3,
        max_tokens: 1000,
    },
    start_message: "开始验证输入内容...",
    complete_message: "输入验证完成",
    error_prefix: "输入验证失败",
};

const ANALYSIS_STAGE: StageSpec = StageSpec {
    round: 2,
    reviewer: "内容质量分析专家",
    system: prompts::ANALYSIS_SYSTEM,
    options: ChatOptions {
        temperature: 0.3,
        max_tokens: 1500,
    },
    start_message: "开始分析内容质量...",
    complete_message: "内容质量分析完成",
    error_prefix: "内容质量分析失败",
};

const DIMENSION_STAGE: StageSpec = StageSpec {
    round: 3,
    reviewer: "各维度评估专家",
    system: prompts::DIMENSION_SYSTEM,
    options: ChatOptions {
        temperature: 0.3,
        max_tokens: 2000,
    },
    start_message: "开始详细评估各维度...",
    complete_message: "各维度评估完成",
    error_prefix: "各维度评估失败",
};

const SYNTHESIS_STAGE: StageSpec = StageSpec {
    round: 4,
    reviewer: "综合评审专家",
    system: prompts::SYNTHESIS_SYSTEM,
    options: ChatOptions {
        temperature: 0.2,
        max_tokens: 3000,
    },
    start_message: "开始综合评估和建议...",
    complete_message: "综合评估完成",
    error_prefix: "综合评估失败",
};

const EXTRACTION_STAGE: StageSpec = StageSpec {
    round: 5,
    reviewer: "结构化评估专家",
    system: prompts::EXTRACTION_SYSTEM,
    options: ChatOptions {
        temperature: 0.1,
        max_tokens: 3000,
    },
    start_message: "正在生成结构化评估结果...",
    complete_message: "结构化评估完成",
    error_prefix: "结构化评估失败",
};

const POLICY_STAGE: StageSpec = StageSpec {
    round: 6,
    reviewer: "政策分析专家",
    system: prompts::POLICY_SYSTEM,
    options: ChatOptions {
        temperature: 0.2,
        max_tokens: 2000,
    },
    start_message: "正在搜索最新相关政策...",
    complete_message: "政策分析完成",
    error_prefix: "政策搜索失败",
};

impl StageSpec {
    fn start(&self) -> ProgressEvent {
        ProgressEvent::StageStart {
            round: self.round,
            reviewer: self.reviewer,
            message: self.start_message.to_string(),
        }
    }

    fn streaming(&self, content: String) -> ProgressEvent {
        ProgressEvent::StageStreaming {
            round: self.round,
            reviewer: self.reviewer,
            content,
        }
    }

    fn complete(&self) -> ProgressEvent {
        ProgressEvent::StageComplete {
            round: self.round,
            reviewer: self.reviewer,
            message: self.complete_message.to_string(),
        }
    }

    fn error(&self, message: String) -> ProgressEvent {
        ProgressEvent::StageError {
            round: self.round,
            reviewer: self.reviewer,
            message,
        }
    }
}

/// Substituted for the policy text when that stage fails entirely.
const POLICY_UNAVAILABLE: &str = "政策搜索暂时不可用，请稍后重试。";

/// Result of draining one stage's delta stream.
enum RelayOutcome {
    /// Stream drained to the end.
    Clean(String),
    /// Stream broke mid-flight; carries the partial text. An error event has
    /// already been emitted, and chunks already sent are not retracted.
    StreamFailed(String),
    /// Client went away; nothing left to emit to.
    Disconnected,
}

/// One evaluation run. Owns its clients and event channel; nothing is shared
/// across requests.
pub struct ReviewPipeline {
    llm: LlmClient,
    policy_llm: LlmClient,
    events: EventSender,
}

impl ReviewPipeline {
    pub fn new(llm: LlmClient, policy_llm: LlmClient, events: EventSender) -> Self {
        Self {
            llm,
            policy_llm,
            events,
        }
    }

    /// Runs the full evaluation, consuming the pipeline.
    pub async fn run(self, proposal_text: String) {
        let proposal = proposal_text.trim();
        if proposal.is_empty() {
            let _ = self.events.send(ProgressEvent::ValidationFailed {
                message: "请提供研究计划文本".to_string(),
            });
            return;
        }

        if self.evaluate(proposal).await.is_none() {
            debug!("evaluation pipeline halted before completion");
        }
    }

    /// The six-stage sequence. `None` means the pipeline halted early —
    /// input rejected, a non-degradable stage failed, or the client
    /// disconnected. Whatever needed emitting has been emitted.
    async fn evaluate(&self, proposal: &str) -> Option<()> {
        // Stage 1: qualitative validation, then the deterministic gate. The
        // gate is applied regardless of the model's judgment.
        let validation = self
            .run_stage(&VALIDATION_STAGE, &prompts::validation_prompt(proposal))
            .await?;

        if guard::rejects(proposal) {
            self.emit(VALIDATION_STAGE.error(
                "检测到过多URL链接或内容过短，请提供实际的申请材料文本内容".to_string(),
            ))?;
            self.emit(ProgressEvent::ValidationFailed {
                message: "输入验证失败".to_string(),
            })?;
            return None;
        }

        // Stage 2: content quality.
        let analysis = self
            .run_stage(&ANALYSIS_STAGE, &prompts::analysis_prompt(proposal))
            .await?;

        // Stage 3: five weighted dimensions in one combined call.
        let dimension = self
            .run_stage(&DIMENSION_STAGE, &prompts::dimension_prompt(proposal))
            .await?;

        // Stage 4: holistic synthesis over everything so far.
        let synthesis = self
            .run_stage_with_fallback(
                &SYNTHESIS_STAGE,
                &prompts::synthesis_prompt(proposal, &validation, &analysis, &dimension),
            )
            .await?;

        // Stage 5: strict-JSON rendering of the score report.
        let review_time = Local::now().to_rfc3339();
        let raw_report = self
            .run_stage_with_fallback(
                &EXTRACTION_STAGE,
                &prompts::extraction_prompt(
                    &validation,
                    &analysis,
                    &dimension,
                    &synthesis,
                    &review_time,
                ),
            )
            .await?;
        let mut review = extract_report(&raw_report);

        // Stage 6: policy analysis on its own endpoint; degrades, never halts.
        let policy_analysis = self
            .run_policy_stage(&prompts::policy_prompt(proposal))
            .await?;
        review.meta.policy_analysis = Some(policy_analysis.clone());

        self.emit(ProgressEvent::Complete {
            review,
            policy_analysis,
        })
    }

    /// Runs one streamed stage: start event, drained stream relayed as
    /// buffered chunks, complete event. Returns the accumulated reply text;
    /// `None` halts the pipeline (error event already emitted, or client
    /// gone).
    async fn run_stage(&self, spec: &StageSpec, prompt: &str) -> Option<String> {
        self.emit(spec.start())?;

        let deltas = match self.llm.stream(spec.system, prompt, spec.options).await {
            Ok(deltas) => deltas,
            Err(e) => {
                warn!("stage {} call failed: {e}", spec.round);
                self.emit(spec.error(format!("{}: {e}", spec.error_prefix)))?;
                return None;
            }
        };

        match self.relay(spec, deltas).await {
            RelayOutcome::Clean(text) => {
                self.emit(spec.complete())?;
                Some(text)
            }
            RelayOutcome::StreamFailed(_) | RelayOutcome::Disconnected => None,
        }
    }

    /// Same as `run_stage`, but degrades once the stream is open: a
    /// mid-flight failure keeps the partial text, and an empty result
    /// triggers one non-streaming call with identical parameters whose full
    /// text is emitted as a single chunk before the complete event.
    async fn run_stage_with_fallback(&self, spec: &StageSpec, prompt: &str) -> Option<String> {
        self.emit(spec.start())?;

        let deltas = match self.llm.stream(spec.system, prompt, spec.options).await {
            Ok(deltas) => deltas,
            Err(e) => {
                warn!("stage {} call failed: {e}", spec.round);
                self.emit(spec.error(format!("{}: {e}", spec.error_prefix)))?;
                return None;
            }
        };

        let mut text = match self.relay(spec, deltas).await {
            RelayOutcome::Clean(text) | RelayOutcome::StreamFailed(text) => text,
            RelayOutcome::Disconnected => return None,
        };

        // Some providers never populate streamed content. One blocking
        // re-call with the same parameters stands in for the whole stream.
        if text.trim().is_empty() {
            match self.llm.complete(spec.system, prompt, spec.options).await {
                Ok(full) if !full.trim().is_empty() => {
                    self.emit(spec.streaming(full.clone()))?;
                    text = full;
                }
                Ok(_) => debug!("stage {} fallback also returned no content", spec.round),
                Err(e) => warn!("stage {} non-streaming fallback failed: {e}", spec.round),
            }
        }

        self.emit(spec.complete())?;
        Some(text)
    }

    /// Policy stage: independent endpoint, degrades through two fallbacks
    /// and never halts the request. `None` only on client disconnect.
    async fn run_policy_stage(&self, prompt: &str) -> Option<String> {
        let spec = &POLICY_STAGE;
        self.emit(spec.start())?;

        let mut text = match self
            .policy_llm
            .stream(spec.system, prompt, spec.options)
            .await
        {
            Ok(deltas) => match self.relay(spec, deltas).await {
                RelayOutcome::Clean(text) | RelayOutcome::StreamFailed(text) => text,
                RelayOutcome::Disconnected => return None,
            },
            Err(e) => {
                warn!("policy stream call failed: {e}");
                String::new()
            }
        };

        if text.trim().is_empty() {
            text = match self
                .policy_llm
                .complete(spec.system, prompt, spec.options)
                .await
            {
                Ok(full) if !full.trim().is_empty() => full,
                Ok(_) => POLICY_UNAVAILABLE.to_string(),
                Err(e) => {
                    warn!("policy non-streaming fallback failed: {e}");
                    POLICY_UNAVAILABLE.to_string()
                }
            };
            self.emit(spec.streaming(text.clone()))?;
        }

        self.emit(spec.complete())?;
        Some(text)
    }

    /// Drains a delta stream, emitting buffered chunks as streaming events.
    /// Partial chunks already emitted are never retracted.
    async fn relay(&self, spec: &StageSpec, mut deltas: DeltaStream) -> RelayOutcome {
        let mut buffer = ChunkBuffer::new();
        let mut text = String::new();

        while let Some(delta) = deltas.recv().await {
            match delta {
                Ok(delta) => {
                    text.push_str(&delta);
                    if let Some(chunk) = buffer.push(&delta) {
                        if !self.events.send(spec.streaming(chunk)) {
                            return RelayOutcome::Disconnected;
                        }
                    }
                }
                Err(e) => {
                    warn!("stage {} stream broke: {e}", spec.round);
                    if !self.events.send(spec.error(format!("流式处理失败: {e}"))) {
                        return RelayOutcome::Disconnected;
                    }
                    return RelayOutcome::StreamFailed(text);
                }
            }
        }

        if let Some(chunk) = buffer.flush() {
            if !self.events.send(spec.streaming(chunk)) {
                return RelayOutcome::Disconnected;
            }
        }
        RelayOutcome::Clean(text)
    }

    fn emit(&self, event: ProgressEvent) -> Option<()> {
        self.events.send(event).then_some(())
    }
}
