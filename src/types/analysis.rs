use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 文件结构分析结果
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StructureAnalysis {
    /// 文件总数
    pub total_files: usize,
    /// 按扩展名统计的文件类型分布
    pub file_types: HashMap<String, usize>,
    /// 按大小区间统计的分布（small/medium/large）
    pub size_distribution: HashMap<String, usize>,
    /// 代码总行数
    pub total_lines: usize,
    /// 最大目录嵌套深度
    pub max_depth: usize,
}

/// 安全分析结果
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SecurityAnalysis {
    /// 命中的可疑代码模式
    pub vulnerabilities: Vec<VulnerabilityFinding>,
    /// 仓库内发现的安全相关文件（SECURITY.md、审计配置等）
    pub security_measures: Vec<String>,
}

/// 单条可疑模式命中记录
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VulnerabilityFinding {
    /// 模式类别，如 command_injection
    pub kind: String,
    /// 命中文件的相对路径
    pub file: String,
    /// 命中行号（从1开始）
    pub line: usize,
}

/// 质量维度的静态统计
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct QualityAnalysis {
    /// 注释行占代码行的比例
    pub comment_ratio: f64,
    /// 平均单文件行数
    pub avg_file_length: f64,
    /// 是否存在测试目录或测试文件
    pub has_tests: bool,
    /// 是否存在README
    pub has_readme: bool,
}

/// 依赖清单分析
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DependencyAnalysis {
    /// manifest文件 -> 依赖名清单
    pub manifests: HashMap<String, Vec<String>>,
    /// 直接依赖总数
    pub direct_dependencies: usize,
}

/// 单个仓库的完整分析
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RepositoryAnalysis {
    pub repo_url: String,
    pub analysis: RepositoryReport,
}

/// 四个维度的分析报告
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RepositoryReport {
    pub structure_analysis: StructureAnalysis,
    pub security_analysis: SecurityAnalysis,
    pub quality_analysis: QualityAnalysis,
    pub dependency_analysis: DependencyAnalysis,
}

/// 代码分析阶段对一篇论文全部仓库的产出
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AnalysisResults {
    /// 成功分析的仓库数量
    pub repositories_analyzed: usize,
    pub analysis_results: Vec<RepositoryAnalysis>,
}
