use serde::{Deserialize, Serialize};

use crate::config::OutputFormat;

/// 文档生成阶段的产出
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Documentation {
    pub format: OutputFormat,
    /// 渲染后的完整文档内容，持久化快照中会被剔除以控制体积
    pub content: String,
    /// 章节名清单
    pub sections: Vec<String>,
}

impl Documentation {
    pub fn section_names(&self) -> Vec<String> {
        self.sections.clone()
    }
}
