use anyhow::Result;
use async_trait::async_trait;

pub mod code_analysis;
pub mod documentation;
pub mod quality;
pub mod research;

pub use code_analysis::CodeAnalysisAgent;
pub use documentation::{DocumentationAgent, DocumentationInput};
pub use quality::QualityAgent;
pub use research::{ResearchAgent, ResearchRequest};

/// 阶段智能体的统一契约：输入 -> 结果，不直接改写上下文
#[async_trait]
pub trait StageAgent: Send + Sync {
    type Input: Send;
    type Output: Send;

    /// 智能体名称，用于日志与错误记录
    fn name(&self) -> &'static str;

    async fn process(&self, input: Self::Input) -> Result<Self::Output>;
}
