use serde::{Deserialize, Serialize};

use crate::config::Conference;

/// 论文基本信息
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Paper {
    /// 论文标题
    pub title: String,
    /// 作者清单
    pub authors: Vec<String>,
    /// 论文页面或PDF地址
    pub url: String,
    /// 摘要
    #[serde(default)]
    pub abstract_text: String,
    /// 从论文中提取的GitHub仓库链接
    #[serde(default)]
    pub github_links: Vec<String>,
}

impl Paper {
    /// 是否携带至少一个可分析的代码仓库链接
    pub fn has_repositories(&self) -> bool {
        !self.github_links.is_empty()
    }
}

/// 研究阶段产出：某届会议的论文清单
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResearchResults {
    pub conference: Conference,
    pub year: String,
    pub papers: Vec<Paper>,
}

impl ResearchResults {
    pub fn paper_count(&self) -> usize {
        self.papers.len()
    }
}
