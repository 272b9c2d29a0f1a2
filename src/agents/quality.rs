use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::agents::StageAgent;
use crate::config::Config;
use crate::types::analysis::{AnalysisResults, RepositoryReport};
use crate::types::quality::{
    QualityMetric, QualityResults, QualityScore, QualityStatus, QualitySummary,
};

/// 负责仓库质量评分的智能体
pub struct QualityAgent {
    #[allow(dead_code)]
    config: Config,
}

impl QualityAgent {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// 评估单个仓库的各维度分数
    fn evaluate_repository(&self, report: &RepositoryReport) -> QualityScore {
        let mut scores = HashMap::new();
        for metric in QualityMetric::ALL {
            scores.insert(metric.as_str().to_string(), score_metric(metric, report));
        }

        let overall_score = QualityMetric::ALL
            .iter()
            .map(|m| m.weight() * scores[m.as_str()])
            .sum::<f64>();
        let recommendations = build_recommendations(&scores);

        QualityScore {
            scores,
            overall_score,
            recommendations,
            status: status_for(overall_score),
        }
    }
}

#[async_trait]
impl StageAgent for QualityAgent {
    type Input = HashMap<String, AnalysisResults>;
    type Output = QualityResults;

    fn name(&self) -> &'static str {
        "QualityAgent"
    }

    /// 对全部已完成的分析结果做一次性质量评估
    async fn process(&self, analysis_results: Self::Input) -> Result<Self::Output> {
        let mut quality_scores = HashMap::new();

        for paper_results in analysis_results.values() {
            for repo in &paper_results.analysis_results {
                let score = self.evaluate_repository(&repo.analysis);
                quality_scores.insert(repo.repo_url.clone(), score);
            }
        }

        let summary = summarize(&quality_scores);
        println!(
            "📊 质量评估完成，共{}个仓库，平均分{:.2}",
            summary.repositories_evaluated, summary.average_score
        );

        Ok(QualityResults {
            quality_scores,
            summary,
        })
    }
}

/// 单维度打分，0.0-1.0
fn score_metric(metric: QualityMetric, report: &RepositoryReport) -> f64 {
    let quality = &report.quality_analysis;
    let security = &report.security_analysis;
    let structure = &report.structure_analysis;

    let score = match metric {
        // 平均文件越长视作越复杂，800行以上计零分
        QualityMetric::CodeComplexity => 1.0 - (quality.avg_file_length / 800.0).min(1.0),
        QualityMetric::Maintainability => {
            let readme_bonus = if quality.has_readme { 0.3 } else { 0.0 };
            let depth_penalty = (structure.max_depth as f64 / 16.0).min(0.3);
            (0.4 + readme_bonus + quality.comment_ratio.min(0.3) - depth_penalty).min(1.0)
        }
        QualityMetric::Security => {
            let penalty = security.vulnerabilities.len() as f64 * 0.05;
            let measures_bonus = if security.security_measures.is_empty() {
                0.0
            } else {
                0.1
            };
            (1.0 - penalty + measures_bonus).min(1.0)
        }
        QualityMetric::Documentation => {
            let readme = if quality.has_readme { 0.6 } else { 0.0 };
            readme + (quality.comment_ratio * 2.0).min(0.4)
        }
        // 静态代理指标：只看测试是否存在
        QualityMetric::TestCoverage => {
            if quality.has_tests {
                0.8
            } else {
                0.1
            }
        }
    };

    score.clamp(0.0, 1.0)
}

fn build_recommendations(scores: &HashMap<String, f64>) -> Vec<String> {
    let mut recommendations = Vec::new();
    for metric in QualityMetric::ALL {
        let score = scores[metric.as_str()];
        if score >= 0.5 {
            continue;
        }
        let advice = match metric {
            QualityMetric::CodeComplexity => "拆分过长的源文件，降低单文件复杂度",
            QualityMetric::Maintainability => "补充README与必要的代码注释，收敛目录层级",
            QualityMetric::Security => "排查命中的可疑代码模式，补充SECURITY.md",
            QualityMetric::Documentation => "完善项目文档与使用说明",
            QualityMetric::TestCoverage => "为核心逻辑补充自动化测试",
        };
        recommendations.push(format!("[{}] {}", metric.as_str(), advice));
    }
    recommendations
}

fn status_for(overall_score: f64) -> QualityStatus {
    if overall_score >= 0.85 {
        QualityStatus::Excellent
    } else if overall_score >= 0.7 {
        QualityStatus::Good
    } else if overall_score >= 0.5 {
        QualityStatus::NeedsImprovement
    } else {
        QualityStatus::Poor
    }
}

fn summarize(quality_scores: &HashMap<String, QualityScore>) -> QualitySummary {
    let repositories_evaluated = quality_scores.len();
    let average_score = if repositories_evaluated > 0 {
        quality_scores
            .values()
            .map(|s| s.overall_score)
            .sum::<f64>()
            / repositories_evaluated as f64
    } else {
        0.0
    };

    let mut status_distribution: HashMap<String, usize> = HashMap::new();
    for score in quality_scores.values() {
        let key = match score.status {
            QualityStatus::Excellent => "excellent",
            QualityStatus::Good => "good",
            QualityStatus::NeedsImprovement => "needs_improvement",
            QualityStatus::Poor => "poor",
        };
        *status_distribution.entry(key.to_string()).or_insert(0) += 1;
    }

    QualitySummary {
        repositories_evaluated,
        average_score,
        status_distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::analysis::{
        QualityAnalysis, RepositoryAnalysis, SecurityAnalysis, VulnerabilityFinding,
    };

    fn healthy_report() -> RepositoryReport {
        RepositoryReport {
            quality_analysis: QualityAnalysis {
                comment_ratio: 0.2,
                avg_file_length: 120.0,
                has_tests: true,
                has_readme: true,
            },
            ..Default::default()
        }
    }

    fn risky_report() -> RepositoryReport {
        let vulnerabilities = (0..10)
            .map(|i| VulnerabilityFinding {
                kind: "command_injection".to_string(),
                file: format!("src/f{}.js", i),
                line: 1,
            })
            .collect();
        RepositoryReport {
            security_analysis: SecurityAnalysis {
                vulnerabilities,
                security_measures: Vec::new(),
            },
            quality_analysis: QualityAnalysis {
                comment_ratio: 0.0,
                avg_file_length: 900.0,
                has_tests: false,
                has_readme: false,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_overall_score_is_weighted_sum_in_range() {
        let config = Config::default();
        let agent = QualityAgent::new(config);
        let score = agent.evaluate_repository(&healthy_report());

        assert!(score.overall_score > 0.0 && score.overall_score <= 1.0);
        assert_eq!(score.scores.len(), QualityMetric::ALL.len());
    }

    #[test]
    fn test_risky_repository_scores_lower_with_recommendations() {
        let agent = QualityAgent::new(Config::default());
        let healthy = agent.evaluate_repository(&healthy_report());
        let risky = agent.evaluate_repository(&risky_report());

        assert!(risky.overall_score < healthy.overall_score);
        assert_eq!(risky.status, QualityStatus::Poor);
        assert!(!risky.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_process_empty_input_yields_zero_summary() {
        let agent = QualityAgent::new(Config::default());
        let results = agent.process(HashMap::new()).await.unwrap();

        assert!(results.quality_scores.is_empty());
        assert_eq!(results.summary.repositories_evaluated, 0);
        assert_eq!(results.summary.average_score, 0.0);
    }

    #[tokio::test]
    async fn test_process_scores_each_repository() {
        let agent = QualityAgent::new(Config::default());
        let mut input = HashMap::new();
        input.insert(
            "Paper A".to_string(),
            AnalysisResults {
                repositories_analyzed: 2,
                analysis_results: vec![
                    RepositoryAnalysis {
                        repo_url: "https://github.com/a/x".to_string(),
                        analysis: healthy_report(),
                    },
                    RepositoryAnalysis {
                        repo_url: "https://github.com/a/y".to_string(),
                        analysis: risky_report(),
                    },
                ],
            },
        );

        let results = agent.process(input).await.unwrap();
        assert_eq!(results.quality_scores.len(), 2);
        assert_eq!(results.summary.repositories_evaluated, 2);
    }
}
