use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 质量评估维度，闭合枚举
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityMetric {
    #[serde(rename = "code_complexity")]
    CodeComplexity,
    #[serde(rename = "maintainability")]
    Maintainability,
    #[serde(rename = "security")]
    Security,
    #[serde(rename = "documentation")]
    Documentation,
    #[serde(rename = "test_coverage")]
    TestCoverage,
}

impl QualityMetric {
    pub const ALL: [QualityMetric; 5] = [
        QualityMetric::CodeComplexity,
        QualityMetric::Maintainability,
        QualityMetric::Security,
        QualityMetric::Documentation,
        QualityMetric::TestCoverage,
    ];

    /// 各维度在综合分中的固定权重
    pub fn weight(&self) -> f64 {
        match self {
            QualityMetric::CodeComplexity => 0.3,
            QualityMetric::Maintainability => 0.25,
            QualityMetric::Security => 0.25,
            QualityMetric::Documentation => 0.1,
            QualityMetric::TestCoverage => 0.1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityMetric::CodeComplexity => "code_complexity",
            QualityMetric::Maintainability => "maintainability",
            QualityMetric::Security => "security",
            QualityMetric::Documentation => "documentation",
            QualityMetric::TestCoverage => "test_coverage",
        }
    }
}

/// 仓库质量等级
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum QualityStatus {
    #[serde(rename = "excellent")]
    Excellent,
    #[serde(rename = "good")]
    Good,
    #[serde(rename = "needs_improvement")]
    NeedsImprovement,
    #[serde(rename = "poor")]
    Poor,
}

/// 单个仓库的质量评分
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QualityScore {
    /// 各维度分数，0.0-1.0
    pub scores: HashMap<String, f64>,
    /// 加权综合分
    pub overall_score: f64,
    /// 改进建议
    pub recommendations: Vec<String>,
    pub status: QualityStatus,
}

/// 质量评估阶段的整体产出
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct QualityResults {
    /// repo_url -> 评分
    pub quality_scores: HashMap<String, QualityScore>,
    pub summary: QualitySummary,
}

/// 全部仓库的质量汇总
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct QualitySummary {
    pub repositories_evaluated: usize,
    pub average_score: f64,
    /// 等级 -> 仓库数
    pub status_distribution: HashMap<String, usize>,
}
