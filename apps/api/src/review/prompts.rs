// All prompt templates for the evaluation pipeline. Templates are content,
// not control flow: each stage is a (system, template) pair with `{...}`
// placeholders substituted before sending. Swapping the rubric text changes
// nothing about the pipeline mechanics.

/// System prompts, one per stage.
pub const VALIDATION_SYSTEM: &str = "你是一位资深的国内青年人才项目评审专家，正在与其他专家进行讨论。";
pub const ANALYSIS_SYSTEM: &str = "你是一位资深的学术内容分析专家，正在评审会议上发言。";
pub const DIMENSION_SYSTEM: &str = "你是一位资深的各维度评估专家，正在评审会议上发言。";
pub const SYNTHESIS_SYSTEM: &str = "你是一位资深的综合评审专家，负责最终的综合评估和建议。";
pub const EXTRACTION_SYSTEM: &str = "你是一位资深的结构化评估专家，专门负责生成标准化的评估结果。";
pub const POLICY_SYSTEM: &str = "你是一位资深的政策分析专家，专门负责搜索和分析国家最新政策。";

const VALIDATION_TEMPLATE: &str = r#"作为输入验证专家，请验证以下申请材料的有效性：

{proposal_text}

**验证标准**：
- 检查是否包含基本的申请材料内容
- 评估内容的完整性和学术价值
- 判断是否适合进行深入评估
- 对于PDF提取的内容，要理解可能包含一些格式信息

请以对话形式回答：
1. 这段内容是否包含有效的国内青年人才申请材料？
2. 内容长度和质量如何？是否包含学术相关要素？
3. 是否值得进行深入评估？
4. 您的初步判断是什么？

请用自然语言回答，就像在与其他专家讨论一样。对于合理的申请材料，应该给予评估机会。"#;

const ANALYSIS_TEMPLATE: &str = r#"作为内容质量分析专家，请深入分析以下申请材料：

{proposal_text}

**极其严格的评估标准**：
- 只有世界顶级水平的研究才能获得高分评价
- 普通水平的研究只能获得中等评价
- 质量差的研究必须给予严厉批评
- 如果材料不完整、缺乏具体数据、没有突出成果，必须指出严重不足

请从以下角度进行详细分析，并以对话形式与其他专家讨论：

1. **内容完整性分析**：
   - 是否包含详细的教育背景信息？是否来自世界顶级大学？
   - 是否有具体的研究成果？是否发表在顶级期刊？
   - 是否描述了突破性创新贡献？是否有重大社会影响？
   - 是否有明确的发展计划？是否具有可操作性？

2. **学术水平评估**：
   - 体现了什么水平的学术能力？是否达到世界级水平？
   - 研究实力如何？是否有独立解决重大科学问题的能力？
   - 与国际水平相比如何？是否具有国际竞争力？

3. **具体程度分析**：
   - 提供了哪些具体数据？是否有量化指标？
   - 成果描述是否具体？是否有详细的技术细节？
   - 计划是否可操作？是否有明确的时间表和里程碑？

4. **逻辑性评价**：
   - 内容结构是否清晰？逻辑是否严密？
   - 各部分是否协调？是否形成完整的研究体系？
   - 是否体现了高水平的学术思维？

请用自然语言详细回答，就像在评审会议上发言一样。记住：宁可严厉批评也不要给予过高评价！"#;

const DIMENSION_TEMPLATE: &str = r#"作为各维度评估专家，请对以下申请材料进行详细评估：

{proposal_text}

**极其严格的评分标准**：
- 5分：世界级突破性成果，发表在Nature/Science级别期刊，有重大社会影响
- 4分：国际一流成果，发表在顶级期刊，有重要学术贡献
- 3分：国内先进水平，有一定学术价值，但缺乏突破性
- 2分：一般水平，成果有限，缺乏创新性
- 1分：质量很差，缺乏学术价值，不适合申请

请分别评估以下5个维度，并以对话形式详细说明：

**维度1：教育、学术与科研工作经历 (权重15%)**
- 教育背景如何？是否来自世界顶级大学？
- 海外科研经历如何？是否在顶级机构工作？
- 项目负责经验如何？是否独立负责重大项目？
- 评分理由是什么？严格按照上述标准评分

**维度2：已取得科学研究及技术创新的成果及贡献 (权重30%)**
- 主要成果有哪些？是否发表在顶级期刊？
- 创新贡献如何？是否有突破性发现？
- 社会影响如何？是否有重大应用价值？
- 评分理由是什么？严格按照上述标准评分

**维度3：学术见解及技术成果独特性和原始创新性评价 (权重20%)**
- 工作的原创性如何？是否解决了前人未解决的问题？
- 独特性体现在哪里？
- 与现有工作的区别？
- 评分理由是什么？

**维度4：发展潜力的评价 (权重20%)**
- 前期成果与国家需求的契合度如何？
- 研究连续性和成果集中度如何？
- 未来发展方向是否明确？
- 评分理由是什么？

**维度5：申请工作设想和国内依托单位支持情况 (权重15%)**
- 工作设想是否具体可行？
- 依托单位支持是否充分？
- 与前期工作的衔接如何？
- 评分理由是什么？

请用自然语言详细回答，就像在评审会议上发言一样。"#;

const SYNTHESIS_TEMPLATE: &str = r#"作为综合评审专家，基于前面的分析，请进行最终的综合评估：

申请材料：{proposal_text}

前面的分析结果：
- 输入验证：{validation}
- 内容质量分析：{analysis}
- 各维度评估：{dimension}

请以对话形式进行最终的综合评估，包括：

1. **综合评分**：给出5个维度的具体分数（1-5分）和加权总分
2. **主要优势分析**：详细分析申请人的主要优势（至少5点）
3. **主要风险分析**：详细分析存在的主要风险（至少5点）
4. **具体改进建议**：提供针对国内青年人才申请的具体、可操作的改进建议（至少8条，按优先级排序），包括：
   - 申请材料的具体修改建议
   - 成果展示的优化方向
   - 申请策略的调整建议
   - 时间安排和准备计划
   - 与依托单位的沟通建议
5. **总体评价**：给出总体评价和最终建议

**极其严格的评分标准**：
- 只有世界顶级水平的研究才能获得4-5分
- 普通水平的研究只能获得2-3分
- 质量差的研究必须给予1-2分
- 如果材料不完整、缺乏具体数据、没有突出成果，总分必须在50分以下
- 如果只是泛泛而谈、没有实质性内容，总分必须在40分以下
- 如果内容空洞、缺乏学术价值，总分必须在30分以下

**评分参考标准**：
- 5分：世界级突破性成果，发表在Nature/Science级别期刊，有重大社会影响
- 4分：国际一流成果，发表在顶级期刊，有重要学术贡献
- 3分：国内先进水平，有一定学术价值，但缺乏突破性
- 2分：一般水平，成果有限，缺乏创新性
- 1分：质量很差，缺乏学术价值，不适合申请

请用自然语言详细回答，就像在评审会议上做最终总结发言一样。记住：宁可给低分也不要给同情分！"#;

const EXTRACTION_TEMPLATE: &str = r#"基于前面的所有分析，请生成结构化的评估结果：

前面的分析：
- 输入验证：{validation}
- 内容质量分析：{analysis}
- 各维度评估：{dimension}
- 综合评估：{final}

**极其严格的评分标准**：
- 5分：世界级突破性成果，发表在Nature/Science级别期刊，有重大社会影响
- 4分：国际一流成果，发表在顶级期刊，有重要学术贡献
- 3分：国内先进水平，有一定学术价值，但缺乏突破性
- 2分：一般水平，成果有限，缺乏创新性
- 1分：质量很差，缺乏学术价值，不适合申请

**评分原则**：
- 只有真正世界级的研究才能获得4-5分
- 普通水平的研究只能获得2-3分
- 质量差的研究必须给予1-2分
- 如果材料不完整、缺乏具体数据、没有突出成果，总分必须在50分以下
- 如果只是泛泛而谈、没有实质性内容，总分必须在40分以下
- 如果内容空洞、缺乏学术价值，总分必须在30分以下

**重要要求**：
1. **优先级改进建议**：必须是针对国内青年人才申请的具体、可操作的改进建议，包括：
   - 申请材料的具体修改建议
   - 成果展示的优化方向
   - 申请策略的调整建议
   - 时间安排和准备计划
   - 与依托单位的沟通建议

2. **详细评估信息**：重点关注申请相关的要素，避免技术细节：
   - 教育背景和海外经历的亮点与不足
   - 科研成果的学术影响力和创新性
   - 与国家重大需求的契合度
   - 工作计划的可行性
   - 依托单位支持的充分性

请严格按照以下JSON格式输出结构化结果：

{
  "meta": {
    "title": "国内青年人才申请评估结果",
    "version": "v1.0",
    "review_time": "{review_time}"
  },
  "scores": [
    {
      "dimension": "教育、学术与科研工作经历",
      "weight": 15,
      "score_1_to_5": 分数,
      "evidence": ["教育背景亮点", "海外经历优势"],
      "issues": ["教育背景不足", "海外经历缺陷"],
      "suggestion": "针对申请的具体改进建议"
    },
    {
      "dimension": "已取得科学研究及技术创新的成果及贡献",
      "weight": 30,
      "score_1_to_5": 分数,
      "evidence": ["主要学术成果", "创新贡献"],
      "issues": ["成果展示不足", "创新性不够"],
      "suggestion": "针对申请的具体改进建议"
    },
    {
      "dimension": "学术见解及技术成果独特性和原始创新性评价",
      "weight": 20,
      "score_1_to_5": 分数,
      "evidence": ["原创性体现", "独特性优势"],
      "issues": ["原创性不足", "独特性不够"],
      "suggestion": "针对申请的具体改进建议"
    },
    {
      "dimension": "发展潜力的评价",
      "weight": 20,
      "score_1_to_5": 分数,
      "evidence": ["与国家需求契合度", "发展前景"],
      "issues": ["契合度不足", "发展前景不明"],
      "suggestion": "针对申请的具体改进建议"
    },
    {
      "dimension": "申请工作设想和国内依托单位支持情况",
      "weight": 15,
      "score_1_to_5": 分数,
      "evidence": ["工作设想可行性", "依托单位支持"],
      "issues": ["工作设想不足", "支持不够充分"],
      "suggestion": "针对申请的具体改进建议"
    }
  ],
  "aggregate": {
    "weighted_total_100": 加权总分,
    "strengths": ["申请优势1", "申请优势2", "申请优势3", "申请优势4", "申请优势5"],
    "risks": ["申请风险1", "申请风险2", "申请风险3", "申请风险4", "申请风险5"],
    "priority_fixes_top5": ["具体可操作的改进建议1", "具体可操作的改进建议2", "具体可操作的改进建议3", "具体可操作的改进建议4", "具体可操作的改进建议5"]
  }
}

请严格按照上述格式输出，不要添加任何其他内容。所有建议必须针对国内青年人才申请，避免技术细节。"#;

const POLICY_TEMPLATE: &str = r#"作为政策分析专家，请搜索并分析以下申请材料相关的国家最新政策：

申请材料：{proposal_text}

请搜索以下方面的最新政策：
1. 国内青年人才项目的最新政策变化
2. 相关学科领域的最新支持政策
3. 人才引进和科研资助的最新政策
4. 创新创业的支持政策
5. 相关产业发展的政策导向

请提供：
1. 最新政策要点（2024-2025年）
2. 政策对申请人的影响分析
3. 基于政策的项目建议
4. 申请策略优化建议

请用自然语言详细回答，就像在政策咨询会议上发言一样。"#;

pub fn validation_prompt(proposal_text: &str) -> String {
    VALIDATION_TEMPLATE.replace("{proposal_text}", proposal_text)
}

pub fn analysis_prompt(proposal_text: &str) -> String {
    ANALYSIS_TEMPLATE.replace("{proposal_text}", proposal_text)
}

pub fn dimension_prompt(proposal_text: &str) -> String {
    DIMENSION_TEMPLATE.replace("{proposal_text}", proposal_text)
}

pub fn synthesis_prompt(
    proposal_text: &str,
    validation: &str,
    analysis: &str,
    dimension: &str,
) -> String {
    SYNTHESIS_TEMPLATE
        .replace("{proposal_text}", proposal_text)
        .replace("{validation}", validation)
        .replace("{analysis}", analysis)
        .replace("{dimension}", dimension)
}

pub fn extraction_prompt(
    validation: &str,
    analysis: &str,
    dimension: &str,
    synthesis: &str,
    review_time: &str,
) -> String {
    EXTRACTION_TEMPLATE
        .replace("{validation}", validation)
        .replace("{analysis}", analysis)
        .replace("{dimension}", dimension)
        .replace("{final}", synthesis)
        .replace("{review_time}", review_time)
}

pub fn policy_prompt(proposal_text: &str) -> String {
    POLICY_TEMPLATE.replace("{proposal_text}", proposal_text)
}
