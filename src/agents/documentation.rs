use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::agents::StageAgent;
use crate::config::{Conference, Config, OutputFormat};
use crate::error::WorkflowError;
use crate::types::analysis::AnalysisResults;
use crate::types::documentation::Documentation;
use crate::types::quality::QualityResults;

/// 文档章节名，顺序即渲染顺序
const SECTION_NAMES: [&str; 4] = [
    "overview",
    "repository_reports",
    "quality_summary",
    "recommendations",
];

/// 文档生成阶段输入
#[derive(Debug, Clone)]
pub struct DocumentationInput {
    pub conference: Conference,
    pub year: String,
    pub analysis_results: HashMap<String, AnalysisResults>,
    pub quality_results: QualityResults,
}

/// 负责汇总报告渲染的智能体
pub struct DocumentationAgent {
    config: Config,
}

impl DocumentationAgent {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// 组装各章节的Markdown内容
    fn build_sections(&self, input: &DocumentationInput) -> Vec<(String, String)> {
        SECTION_NAMES
            .iter()
            .map(|name| {
                let body = match *name {
                    "overview" => render_overview(input),
                    "repository_reports" => render_repository_reports(input),
                    "quality_summary" => render_quality_summary(input),
                    "recommendations" => render_recommendations(input),
                    _ => unreachable!("unknown section"),
                };
                (name.to_string(), body)
            })
            .collect()
    }
}

#[async_trait]
impl StageAgent for DocumentationAgent {
    type Input = DocumentationInput;
    type Output = Documentation;

    fn name(&self) -> &'static str {
        "DocumentationAgent"
    }

    async fn process(&self, input: Self::Input) -> Result<Self::Output> {
        let sections = self.build_sections(&input);
        let markdown_content = sections
            .iter()
            .map(|(_, body)| body.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        // 闭合枚举分发，pdf是明确的不支持路径而非静默空结果
        let format = self.config.output_format;
        let content = match format {
            OutputFormat::Markdown => markdown_content,
            OutputFormat::Html => markdown::to_html(&markdown_content),
            OutputFormat::Pdf => {
                return Err(WorkflowError::UnsupportedFormat("pdf".to_string()).into());
            }
        };

        Ok(Documentation {
            format,
            content,
            sections: sections.into_iter().map(|(name, _)| name).collect(),
        })
    }
}

fn render_overview(input: &DocumentationInput) -> String {
    let total_repos: usize = input
        .analysis_results
        .values()
        .map(|r| r.repositories_analyzed)
        .sum();
    format!(
        "# {} {} 论文代码分析报告\n\n\
         - 覆盖论文: {}\n\
         - 分析仓库: {}\n\
         - 质量评估仓库: {}\n",
        input.conference.to_string().to_uppercase(),
        input.year,
        input.analysis_results.len(),
        total_repos,
        input.quality_results.summary.repositories_evaluated,
    )
}

fn render_repository_reports(input: &DocumentationInput) -> String {
    let mut out = String::from("## 仓库分析明细\n");

    // 按论文标题排序保证输出稳定
    let mut titles: Vec<_> = input.analysis_results.keys().collect();
    titles.sort();

    for title in titles {
        let results = &input.analysis_results[title];
        out.push_str(&format!("\n### {}\n", title));
        for repo in &results.analysis_results {
            let s = &repo.analysis.structure_analysis;
            let q = &repo.analysis.quality_analysis;
            out.push_str(&format!(
                "- [{}]({})：{}个文件，{}行代码，注释率{:.1}%，{}\n",
                repo.repo_url,
                repo.repo_url,
                s.total_files,
                s.total_lines,
                q.comment_ratio * 100.0,
                if q.has_tests { "有测试" } else { "无测试" },
            ));
            let vulns = repo.analysis.security_analysis.vulnerabilities.len();
            if vulns > 0 {
                out.push_str(&format!("  - ⚠️ 命中{}处可疑代码模式\n", vulns));
            }
        }
    }
    out
}

fn render_quality_summary(input: &DocumentationInput) -> String {
    let summary = &input.quality_results.summary;
    let mut out = format!(
        "## 质量评估汇总\n\n平均综合分: {:.2}（{}个仓库）\n",
        summary.average_score, summary.repositories_evaluated
    );

    let mut urls: Vec<_> = input.quality_results.quality_scores.keys().collect();
    urls.sort();
    for url in urls {
        let score = &input.quality_results.quality_scores[url];
        out.push_str(&format!(
            "- {}: {:.2} ({:?})\n",
            url, score.overall_score, score.status
        ));
    }
    out
}

fn render_recommendations(input: &DocumentationInput) -> String {
    let mut out = String::from("## 改进建议\n");
    let mut urls: Vec<_> = input.quality_results.quality_scores.keys().collect();
    urls.sort();

    let mut any = false;
    for url in urls {
        let score = &input.quality_results.quality_scores[url];
        if score.recommendations.is_empty() {
            continue;
        }
        any = true;
        out.push_str(&format!("\n### {}\n", url));
        for recommendation in &score.recommendations {
            out.push_str(&format!("- {}\n", recommendation));
        }
    }
    if !any {
        out.push_str("\n所有仓库均未触发改进建议。\n");
    }
    out
}
