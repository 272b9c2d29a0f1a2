use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{Conference, OutputFormat};
use crate::types::analysis::AnalysisResults;
use crate::types::documentation::Documentation;
use crate::types::paper::ResearchResults;
use crate::types::quality::QualityResults;

/// 分析阶段枚举
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    #[serde(rename = "initialization")]
    Init,
    #[serde(rename = "research")]
    Research,
    #[serde(rename = "code_analysis")]
    CodeAnalysis,
    #[serde(rename = "quality_assessment")]
    QualityAssessment,
    #[serde(rename = "documentation")]
    Documentation,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
}

impl AnalysisStage {
    /// 正向推进序号。Failed是带外终态，不参与顺序比较
    pub fn order(&self) -> Option<u8> {
        match self {
            AnalysisStage::Init => Some(0),
            AnalysisStage::Research => Some(1),
            AnalysisStage::CodeAnalysis => Some(2),
            AnalysisStage::QualityAssessment => Some(3),
            AnalysisStage::Documentation => Some(4),
            AnalysisStage::Completed => Some(5),
            AnalysisStage::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStage::Completed | AnalysisStage::Failed)
    }

    /// 是否已到达（或越过）指定阶段
    pub fn reached(&self, other: AnalysisStage) -> bool {
        match (self.order(), other.order()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }
}

impl std::fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisStage::Init => write!(f, "initialization"),
            AnalysisStage::Research => write!(f, "research"),
            AnalysisStage::CodeAnalysis => write!(f, "code_analysis"),
            AnalysisStage::QualityAssessment => write!(f, "quality_assessment"),
            AnalysisStage::Documentation => write!(f, "documentation"),
            AnalysisStage::Completed => write!(f, "completed"),
            AnalysisStage::Failed => write!(f, "failed"),
        }
    }
}

/// 单条错误记录，只追加，不用于控制流
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub stage: AnalysisStage,
    pub error_kind: String,
    pub message: String,
    /// 任意结构化诊断信息
    pub context: Value,
}

/// 一次工作流运行的进度、结果与错误台账
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// 会议标识，创建后不可变
    pub conference: Conference,
    /// 届次年份，创建后不可变
    pub year: String,
    pub start_time: DateTime<Utc>,
    /// 到达终态前为None
    pub end_time: Option<DateTime<Utc>>,

    pub current_stage: AnalysisStage,
    /// 0.0-1.0，成功运行期间单调不减
    pub progress: f64,
    pub errors: Vec<ErrorRecord>,

    pub research_results: Option<ResearchResults>,
    /// 论文标题 -> 分析结果，随代码分析阶段逐条填充
    pub analysis_results: HashMap<String, AnalysisResults>,
    pub quality_results: Option<QualityResults>,
    pub documentation: Option<Documentation>,

    /// 临时键值暂存，不进入持久化快照
    cache: HashMap<String, Value>,
}

impl AnalysisContext {
    pub fn new(conference: Conference, year: impl Into<String>) -> Self {
        Self {
            conference,
            year: year.into(),
            start_time: Utc::now(),
            end_time: None,
            current_stage: AnalysisStage::Init,
            progress: 0.0,
            errors: Vec::new(),
            research_results: None,
            analysis_results: HashMap::new(),
            quality_results: None,
            documentation: None,
            cache: HashMap::new(),
        }
    }

    /// 更新当前阶段与进度
    pub fn update_stage(&mut self, stage: AnalysisStage, progress: Option<f64>) {
        self.current_stage = stage;
        if let Some(p) = progress {
            self.progress = p.clamp(0.0, 1.0);
        }
    }

    /// 写入研究结果并推进到代码分析阶段
    pub fn update_research_results(&mut self, results: ResearchResults) {
        self.research_results = Some(results);
        self.update_stage(AnalysisStage::CodeAnalysis, Some(0.25));
    }

    /// 写入单篇论文的代码分析结果，按完成比例推进进度
    pub fn update_analysis_results(&mut self, paper_title: &str, results: AnalysisResults) {
        self.analysis_results
            .insert(paper_title.to_string(), results);

        let total_papers = self
            .research_results
            .as_ref()
            .map(|r| r.papers.len())
            .unwrap_or(0);
        if total_papers > 0 {
            let progress = 0.25 + (self.analysis_results.len() as f64 / total_papers as f64) * 0.25;
            self.update_stage(AnalysisStage::CodeAnalysis, Some(progress));
        }
    }

    /// 写入质量评估结果并推进到文档阶段
    pub fn update_quality_results(&mut self, results: QualityResults) {
        self.quality_results = Some(results);
        self.update_stage(AnalysisStage::Documentation, Some(0.75));
    }

    /// 写入文档产出，工作流到达完成终态
    pub fn update_documentation(&mut self, documentation: Documentation) {
        self.documentation = Some(documentation);
        self.update_stage(AnalysisStage::Completed, Some(1.0));
        self.end_time = Some(Utc::now());
    }

    /// 标记整个工作流失败
    pub fn mark_failed(&mut self) {
        self.current_stage = AnalysisStage::Failed;
        self.end_time = Some(Utc::now());
    }

    /// 追加一条错误记录
    pub fn add_error(
        &mut self,
        stage: AnalysisStage,
        error_kind: impl Into<String>,
        message: impl Into<String>,
        context: Value,
    ) {
        self.errors.push(ErrorRecord {
            timestamp: Utc::now(),
            stage,
            error_kind: error_kind.into(),
            message: message.into(),
            context,
        });
    }

    pub fn set_cache(&mut self, key: &str, value: Value) {
        self.cache.insert(key.to_string(), value);
    }

    pub fn get_cache(&self, key: &str) -> Option<&Value> {
        self.cache.get(key)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// 导出持久化快照。文档正文被剔除以控制快照体积
    pub fn to_snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            basic_info: SnapshotBasicInfo {
                conference: self.conference,
                year: self.year.clone(),
                start_time: self.start_time,
                end_time: self.end_time,
            },
            status: SnapshotStatus {
                current_stage: self.current_stage,
                progress: self.progress,
                errors: self.errors.clone(),
            },
            results: SnapshotResults {
                research: self.research_results.clone(),
                analysis: self.analysis_results.clone(),
                quality: self.quality_results.clone(),
                documentation: self.documentation.as_ref().map(|doc| DocumentationMeta {
                    format: doc.format,
                    sections: doc.sections.clone(),
                }),
            },
        }
    }

    /// 从快照重建上下文。文档正文按快照约定为空
    pub fn from_snapshot(snapshot: ContextSnapshot) -> Self {
        Self {
            conference: snapshot.basic_info.conference,
            year: snapshot.basic_info.year,
            start_time: snapshot.basic_info.start_time,
            end_time: snapshot.basic_info.end_time,
            current_stage: snapshot.status.current_stage,
            progress: snapshot.status.progress,
            errors: snapshot.status.errors,
            research_results: snapshot.results.research,
            analysis_results: snapshot.results.analysis,
            quality_results: snapshot.results.quality,
            documentation: snapshot.results.documentation.map(|meta| Documentation {
                format: meta.format,
                content: String::new(),
                sections: meta.sections,
            }),
            cache: HashMap::new(),
        }
    }

    /// 按需校验上下文不变量，列出全部违反项而非首个。仅用于诊断
    pub fn validate(&self) -> ValidationReport {
        let mut violations = Vec::new();

        if self.year.trim().is_empty() {
            violations.push("year is missing".to_string());
        }
        if !(0.0..=1.0).contains(&self.progress) {
            violations.push(format!("progress {} out of [0, 1]", self.progress));
        }

        if self.current_stage == AnalysisStage::Completed {
            if self.end_time.is_none() {
                violations.push("end_time is missing for completed analysis".to_string());
            }
            if self.progress != 1.0 {
                violations.push("progress should be 1.0 for completed analysis".to_string());
            }
        }

        if self.current_stage.reached(AnalysisStage::CodeAnalysis)
            && self.research_results.is_none()
        {
            violations.push("research results are missing".to_string());
        }
        if self.current_stage.reached(AnalysisStage::QualityAssessment)
            && self.analysis_results.is_empty()
        {
            violations.push("analysis results are missing".to_string());
        }
        if self.current_stage.reached(AnalysisStage::Documentation)
            && self.quality_results.is_none()
        {
            violations.push("quality results are missing".to_string());
        }
        if self.current_stage.reached(AnalysisStage::Completed) && self.documentation.is_none() {
            violations.push("documentation is missing".to_string());
        }

        ValidationReport { violations }
    }
}

impl std::fmt::Display for AnalysisContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AnalysisContext({} {}, {}, {:.1}%)",
            self.conference,
            self.year,
            self.current_stage,
            self.progress * 100.0
        )
    }
}

/// 不变量校验报告
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub violations: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// 可持久化的上下文快照
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContextSnapshot {
    pub basic_info: SnapshotBasicInfo,
    pub status: SnapshotStatus,
    pub results: SnapshotResults,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SnapshotBasicInfo {
    pub conference: Conference,
    pub year: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SnapshotStatus {
    pub current_stage: AnalysisStage,
    pub progress: f64,
    pub errors: Vec<ErrorRecord>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SnapshotResults {
    pub research: Option<ResearchResults>,
    pub analysis: HashMap<String, AnalysisResults>,
    pub quality: Option<QualityResults>,
    /// 只保留文档元信息，正文另行落盘
    pub documentation: Option<DocumentationMeta>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DocumentationMeta {
    pub format: OutputFormat,
    pub sections: Vec<String>,
}
