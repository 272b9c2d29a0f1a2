use thiserror::Error;

use crate::coordinator::context::AnalysisStage;

/// 工作流错误分类
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// 配置缺失或非法，在任何阶段执行前快速失败
    #[error("configuration error: {0}")]
    Configuration(String),

    /// 阶段协作方（抓取、克隆、静态分析等外部工具）执行失败
    #[error("collaborator error in stage {stage}: {message}")]
    Collaborator {
        stage: AnalysisStage,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 重试策略耗尽全部尝试次数后的最终失败
    #[error("operation failed after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    /// 上下文不变量校验失败，仅用于诊断，不参与控制流
    #[error("context validation failed: {0:?}")]
    Validation(Vec<String>),

    /// 闭合枚举之外的输出格式请求
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),
}

impl WorkflowError {
    /// 错误分类名，写入上下文错误记录的error_kind字段
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Configuration(_) => "ConfigurationError",
            WorkflowError::Collaborator { .. } => "CollaboratorError",
            WorkflowError::RetryExhausted { .. } => "RetryExhaustedError",
            WorkflowError::Validation(_) => "ValidationError",
            WorkflowError::UnsupportedFormat(_) => "UnsupportedFormatError",
        }
    }

    pub fn collaborator(stage: AnalysisStage, message: impl Into<String>) -> Self {
        WorkflowError::Collaborator {
            stage,
            message: message.into(),
            source: None,
        }
    }

    pub fn collaborator_with_source(
        stage: AnalysisStage,
        message: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        WorkflowError::Collaborator {
            stage,
            message: message.into(),
            source: Some(source),
        }
    }
}
