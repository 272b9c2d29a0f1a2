use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::agents::{
    CodeAnalysisAgent, DocumentationAgent, DocumentationInput, QualityAgent, ResearchAgent,
    ResearchRequest, StageAgent,
};
use crate::config::{Conference, Config};
use crate::coordinator::context::{AnalysisContext, AnalysisStage};
use crate::coordinator::retry::retry_with_backoff;
use crate::error::WorkflowError;
use crate::types::analysis::AnalysisResults;
use crate::types::documentation::Documentation;
use crate::types::paper::ResearchResults;
use crate::types::quality::QualityResults;
use crate::utils::threads::do_parallel_with_limit;

/// 各阶段智能体的对象安全别名，便于测试注入
pub type ResearchStage = Arc<dyn StageAgent<Input = ResearchRequest, Output = ResearchResults>>;
pub type CodeAnalysisStage = Arc<dyn StageAgent<Input = Vec<String>, Output = AnalysisResults>>;
pub type QualityStage =
    Arc<dyn StageAgent<Input = HashMap<String, AnalysisResults>, Output = QualityResults>>;
pub type DocumentationStage =
    Arc<dyn StageAgent<Input = DocumentationInput, Output = Documentation>>;

/// 工作流最终总结
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkflowSummary {
    pub conference: Conference,
    pub year: String,
    /// 研究阶段发现的论文总数
    pub papers_analyzed: usize,
    /// 成功完成代码分析的论文数
    pub repositories_analyzed: usize,
    /// 全部仓库综合分均值，无可用分数时为0.0
    pub average_quality_score: f64,
    pub documentation_sections: Vec<String>,
    pub processing_time_seconds: f64,
}

/// 工作流协调器：串联研究、代码分析、质量评估、文档生成四个阶段，
/// 维护上下文状态并负责结果持久化
pub struct WorkflowCoordinator {
    config: Config,
    research_agent: ResearchStage,
    code_analysis_agent: CodeAnalysisStage,
    quality_agent: QualityStage,
    documentation_agent: DocumentationStage,
    context: AnalysisContext,
}

impl WorkflowCoordinator {
    pub fn new(config: Config) -> Result<Self> {
        let research_agent: ResearchStage = Arc::new(ResearchAgent::new(config.clone())?);
        let code_analysis_agent: CodeAnalysisStage =
            Arc::new(CodeAnalysisAgent::new(config.clone()));
        let quality_agent: QualityStage = Arc::new(QualityAgent::new(config.clone()));
        let documentation_agent: DocumentationStage =
            Arc::new(DocumentationAgent::new(config.clone()));

        Ok(Self::with_agents(
            config,
            research_agent,
            code_analysis_agent,
            quality_agent,
            documentation_agent,
        ))
    }

    /// 以自定义智能体构造协调器，测试替身从这里注入
    pub fn with_agents(
        config: Config,
        research_agent: ResearchStage,
        code_analysis_agent: CodeAnalysisStage,
        quality_agent: QualityStage,
        documentation_agent: DocumentationStage,
    ) -> Self {
        Self {
            config,
            research_agent,
            code_analysis_agent,
            quality_agent,
            documentation_agent,
            context: AnalysisContext::new(Conference::default(), ""),
        }
    }

    /// 当前上下文，供状态查询与测试断言
    pub fn context(&self) -> &AnalysisContext {
        &self.context
    }

    /// 处理指定会议与年份的论文。研究、质量、文档阶段失败即整体失败；
    /// 单篇论文的代码分析失败只记录错误并跳过
    pub async fn process_papers(
        &mut self,
        conference: Conference,
        year: &str,
    ) -> Result<WorkflowSummary> {
        if year.trim().is_empty() {
            return Err(WorkflowError::Configuration("year must not be empty".to_string()).into());
        }

        // 1. 初始化上下文
        self.context = AnalysisContext::new(conference, year);
        self.context
            .update_stage(AnalysisStage::Research, Some(0.05));

        // 2. 论文研究阶段，失败则整个工作流终止
        println!("🚀 开始分析 {} {} 论文", conference, year);
        let research_agent = Arc::clone(&self.research_agent);
        let request = ResearchRequest {
            conference,
            year: year.to_string(),
        };
        let research_results = match retry_with_backoff(&self.config.retry, "论文研究", || {
            research_agent.process(request.clone())
        })
        .await
        {
            Ok(results) => results,
            Err(e) => return Err(self.fail_stage(AnalysisStage::Research, e)),
        };
        let papers = research_results.papers.clone();
        self.context.update_research_results(research_results);

        // 3. 代码分析阶段，逐篇容错
        self.run_code_analysis(&papers).await;

        // 4. 质量评估阶段
        self.context
            .update_stage(AnalysisStage::QualityAssessment, None);
        let quality_agent = Arc::clone(&self.quality_agent);
        let analysis_snapshot = self.context.analysis_results.clone();
        let quality_results = match retry_with_backoff(&self.config.retry, "质量评估", || {
            quality_agent.process(analysis_snapshot.clone())
        })
        .await
        {
            Ok(results) => results,
            Err(e) => return Err(self.fail_stage(AnalysisStage::QualityAssessment, e)),
        };
        self.context.update_quality_results(quality_results);

        // 5. 文档生成阶段
        let documentation_agent = Arc::clone(&self.documentation_agent);
        let doc_input = DocumentationInput {
            conference,
            year: year.to_string(),
            analysis_results: self.context.analysis_results.clone(),
            quality_results: self
                .context
                .quality_results
                .clone()
                .unwrap_or_default(),
        };
        let documentation = match retry_with_backoff(&self.config.retry, "文档生成", || {
            documentation_agent.process(doc_input.clone())
        })
        .await
        {
            Ok(doc) => doc,
            Err(e) => return Err(self.fail_stage(AnalysisStage::Documentation, e)),
        };
        self.context.update_documentation(documentation);

        // 6. 持久化快照与文档
        self.save_results().await?;

        // 诊断性校验，违反项只告警不阻断
        let report = self.context.validate();
        if !report.is_valid() && self.config.verbose {
            eprintln!(
                "⚠️ {}",
                WorkflowError::Validation(report.violations)
            );
        }

        // 7. 计算总结
        let summary = self.generate_summary();
        println!(
            "✓ 分析完成: {}篇论文，{}篇完成代码分析，平均质量分{:.2}",
            summary.papers_analyzed, summary.repositories_analyzed, summary.average_quality_score
        );
        Ok(summary)
    }

    /// 逐篇执行代码分析。携带仓库链接的论文才会被分析，
    /// 并发度由配置的信号量上限约束
    async fn run_code_analysis(&mut self, papers: &[crate::types::paper::Paper]) {
        let candidates: Vec<_> = papers.iter().filter(|p| p.has_repositories()).collect();
        if candidates.is_empty() {
            return;
        }
        println!("🔬 开始代码分析，共{}篇论文携带仓库链接", candidates.len());

        if self.config.analysis.parallel {
            let retry = self.config.retry.clone();
            let analysis_futures: Vec<_> = candidates
                .iter()
                .map(|paper| {
                    let agent = Arc::clone(&self.code_analysis_agent);
                    let title = paper.title.clone();
                    let links = paper.github_links.clone();
                    let retry = retry.clone();
                    async move {
                        let result =
                            retry_with_backoff(&retry, "代码分析", || agent.process(links.clone()))
                                .await;
                        (title, result)
                    }
                })
                .collect();

            let outcomes = do_parallel_with_limit(
                analysis_futures,
                self.config.analysis.max_concurrent_downloads,
            )
            .await;
            for (title, result) in outcomes {
                self.merge_analysis_outcome(&title, result);
            }
        } else {
            for paper in candidates {
                let agent = Arc::clone(&self.code_analysis_agent);
                let links = paper.github_links.clone();
                let result =
                    retry_with_backoff(&self.config.retry, "代码分析", || {
                        agent.process(links.clone())
                    })
                    .await;
                self.merge_analysis_outcome(&paper.title, result);
            }
        }
    }

    /// 合并单篇论文的分析结果；失败记入错误台账但不中断流程
    fn merge_analysis_outcome(&mut self, title: &str, result: Result<AnalysisResults>) {
        match result {
            Ok(results) => self.context.update_analysis_results(title, results),
            Err(e) => {
                eprintln!("❌ 论文代码分析失败 [{}]: {}", title, e);
                self.context.add_error(
                    AnalysisStage::CodeAnalysis,
                    error_kind(&e),
                    e.to_string(),
                    json!({ "paper_title": title }),
                );
            }
        }
    }

    /// 记录致命错误并把上下文置为失败终态
    fn fail_stage(&mut self, stage: AnalysisStage, error: anyhow::Error) -> anyhow::Error {
        self.context.add_error(
            stage,
            error_kind(&error),
            error.to_string(),
            json!({
                "conference": self.context.conference.to_string(),
                "year": self.context.year,
            }),
        );
        self.context.mark_failed();
        error
    }

    /// 落盘两份产物：结构化上下文快照与渲染后的文档正文
    async fn save_results(&self) -> Result<()> {
        let output_dir = &self.config.output_path;
        tokio::fs::create_dir_all(output_dir).await?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");

        let snapshot = self.context.to_snapshot();
        let snapshot_path = output_dir.join(format!("context_{}.json", timestamp));
        tokio::fs::write(&snapshot_path, serde_json::to_string_pretty(&snapshot)?).await?;

        if let Some(documentation) = &self.context.documentation {
            let doc_path = output_dir.join(format!(
                "documentation_{}.{}",
                timestamp,
                documentation.format.extension()
            ));
            tokio::fs::write(&doc_path, &documentation.content).await?;
            println!("💾 文档已保存: {}", doc_path.display());
        }

        Ok(())
    }

    /// 生成分析总结
    fn generate_summary(&self) -> WorkflowSummary {
        let papers_analyzed = self
            .context
            .research_results
            .as_ref()
            .map(|r| r.papers.len())
            .unwrap_or(0);

        WorkflowSummary {
            conference: self.context.conference,
            year: self.context.year.clone(),
            papers_analyzed,
            repositories_analyzed: self.context.analysis_results.len(),
            average_quality_score: self.calculate_average_quality(),
            documentation_sections: self
                .context
                .documentation
                .as_ref()
                .map(|d| d.section_names())
                .unwrap_or_default(),
            processing_time_seconds: (Utc::now() - self.context.start_time).num_milliseconds()
                as f64
                / 1000.0,
        }
    }

    /// 计算全部仓库综合分的均值，无可用分数时为0.0
    fn calculate_average_quality(&self) -> f64 {
        let Some(quality_results) = &self.context.quality_results else {
            return 0.0;
        };

        let scores: Vec<f64> = quality_results
            .quality_scores
            .values()
            .map(|s| s.overall_score)
            .collect();
        if scores.is_empty() {
            return 0.0;
        }
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// 提取错误分类名，写入错误记录的error_kind字段
fn error_kind(error: &anyhow::Error) -> &'static str {
    error
        .downcast_ref::<WorkflowError>()
        .map(|e| e.kind())
        .unwrap_or("CollaboratorError")
}

/// 启动一次完整的论文分析工作流
pub async fn launch(config: &Config, conference: Conference, year: &str) -> Result<WorkflowSummary> {
    let mut coordinator = WorkflowCoordinator::new(config.clone())?;
    coordinator.process_papers(conference, year).await
}
