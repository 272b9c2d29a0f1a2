use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;

use crate::agents::StageAgent;
use crate::cache::CacheManager;
use crate::config::{AnalysisDepth, Conference, Config};
use crate::coordinator::context::AnalysisStage;
use crate::error::WorkflowError;
use crate::types::paper::{Paper, ResearchResults};
use crate::utils::threads::do_parallel_with_limit;

/// GitHub仓库链接模式
static GITHUB_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://github\.com/[\w.-]+/[\w.-]+").expect("invalid github link pattern")
});

/// 议程页中的论文条目链接。选择器精度不是这里的重点，宽松匹配即可
static PAPER_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a[^>]+href="([^"]+)"[^>]*>([^<]{12,240})</a>"#)
        .expect("invalid paper entry pattern")
});

/// 研究阶段输入
#[derive(Debug, Clone)]
pub struct ResearchRequest {
    pub conference: Conference,
    pub year: String,
}

/// 负责论文发现与代码链接提取的智能体
pub struct ResearchAgent {
    config: Config,
    client: reqwest::Client,
    cache: CacheManager,
}

impl ResearchAgent {
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.research.request_timeout_seconds))
            .user_agent(concat!("securipaper-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build http client")?;
        let cache = CacheManager::new(config.cache.clone());

        Ok(Self {
            config,
            client,
            cache,
        })
    }

    /// 构造指定会议与年份的议程页地址。闭合枚举分发，不存在未支持分支
    fn proceedings_url(&self, conference: Conference, year: &str) -> String {
        let research = &self.config.research;
        match conference {
            Conference::Ccs => format!("{}/ccs{}", research.acm_base_url, year),
            Conference::Sp => format!("{}/sp{}", research.ieee_base_url, year),
            Conference::Ndss => format!("{}/ndss{}", research.ndss_base_url, year),
            Conference::Usenix => {
                format!("{}/usenixsecurity{}", research.usenix_base_url, year)
            }
        }
    }

    /// 抓取页面，命中缓存则跳过网络请求
    async fn fetch_page(&self, url: &str) -> Result<String> {
        if let Some(cached) = self.cache.get::<String>("pages", url).await? {
            if self.config.verbose {
                println!("📦 页面缓存命中: {}", url);
            }
            return Ok(cached);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed: {}", url))?
            .error_for_status()
            .with_context(|| format!("Bad status from: {}", url))?;
        let body = response.text().await.context("Failed to read body")?;

        self.cache.set("pages", url, body.clone()).await?;
        Ok(body)
    }

    /// 从议程页HTML里提取论文条目
    fn parse_papers(&self, html: &str, base_url: &str) -> Vec<Paper> {
        let mut papers = Vec::new();
        let mut seen_titles = HashSet::new();

        for capture in PAPER_ENTRY.captures_iter(html) {
            let href = capture[1].trim();
            let title = capture[2].trim();

            // 只保留指向论文详情或PDF的链接
            let looks_like_paper = href.contains("paper")
                || href.contains("/doi/")
                || href.contains("presentation")
                || href.ends_with(".pdf");
            if !looks_like_paper || !seen_titles.insert(title.to_string()) {
                continue;
            }

            papers.push(Paper {
                title: title.to_string(),
                authors: Vec::new(),
                url: absolutize(base_url, href),
                abstract_text: String::new(),
                github_links: Vec::new(),
            });
        }

        papers
    }

    /// 抓取论文详情页并提取GitHub链接，单篇失败不影响其它论文
    async fn enrich_paper_links(&self, mut paper: Paper) -> Paper {
        match self.fetch_page(&paper.url).await {
            Ok(html) => {
                paper.github_links = extract_github_links(&html);
            }
            Err(e) => {
                eprintln!("⚠️ 获取论文页面失败 [{}]: {}", paper.title, e);
            }
        }
        paper
    }
}

#[async_trait]
impl StageAgent for ResearchAgent {
    type Input = ResearchRequest;
    type Output = ResearchResults;

    fn name(&self) -> &'static str {
        "ResearchAgent"
    }

    async fn process(&self, input: Self::Input) -> Result<Self::Output> {
        let url = self.proceedings_url(input.conference, &input.year);
        println!("🔍 开始检索 {} {} 论文: {}", input.conference, input.year, url);

        let html = self.fetch_page(&url).await.map_err(|e| {
            WorkflowError::collaborator_with_source(
                AnalysisStage::Research,
                format!("failed to fetch proceedings page for {}", input.conference),
                e,
            )
        })?;

        let mut papers = self.parse_papers(&html, &url);

        // basic深度只做页面级提取，不逐篇抓详情页。页面级链接无法归属到
        // 具体论文，统一挂到一个聚合条目上，避免同一仓库被逐篇重复分析
        if self.config.analysis.depth == AnalysisDepth::Basic {
            if let Some(aggregate) = page_level_paper(input.conference, &input.year, &url, &html) {
                papers.push(aggregate);
            }
        } else {
            let enrich_futures: Vec<_> = papers
                .into_iter()
                .map(|paper| self.enrich_paper_links(paper))
                .collect();
            papers = do_parallel_with_limit(
                enrich_futures,
                self.config.analysis.max_concurrent_downloads,
            )
            .await;
        }

        println!(
            "✓ 检索完成，共{}篇论文，其中{}篇携带代码仓库链接",
            papers.len(),
            papers.iter().filter(|p| p.has_repositories()).count()
        );

        Ok(ResearchResults {
            conference: input.conference,
            year: input.year,
            papers,
        })
    }
}

/// 把议程页面级的GitHub链接聚合成单个条目，页面无链接时返回None
fn page_level_paper(
    conference: Conference,
    year: &str,
    page_url: &str,
    html: &str,
) -> Option<Paper> {
    let page_links = extract_github_links(html);
    if page_links.is_empty() {
        return None;
    }
    Some(Paper {
        title: format!("{} {} proceedings page", conference, year),
        authors: Vec::new(),
        url: page_url.to_string(),
        abstract_text: String::new(),
        github_links: page_links,
    })
}

/// 提取去重后的GitHub仓库链接
fn extract_github_links(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    GITHUB_LINK
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(".git").to_string())
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// 把相对链接转成绝对链接
fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    if let Some(rest) = href.strip_prefix('/') {
        // 取base的origin部分
        if let Some(scheme_end) = base_url.find("://") {
            let origin_end = base_url[scheme_end + 3..]
                .find('/')
                .map(|i| scheme_end + 3 + i)
                .unwrap_or(base_url.len());
            return format!("{}/{}", &base_url[..origin_end], rest);
        }
    }
    format!("{}/{}", base_url.trim_end_matches('/'), href)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_github_links_dedup() {
        let text = r#"
            see https://github.com/alice/fuzzer and docs.
            artifact: https://github.com/alice/fuzzer.git
            also https://github.com/bob/verifier
        "#;
        let links = extract_github_links(text);
        assert_eq!(
            links,
            vec![
                "https://github.com/alice/fuzzer".to_string(),
                "https://github.com/bob/verifier".to_string(),
            ]
        );
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize("https://www.ndss-symposium.org/ndss2024", "/paper/x"),
            "https://www.ndss-symposium.org/paper/x"
        );
        assert_eq!(
            absolutize("https://a.org/base", "https://b.org/p"),
            "https://b.org/p"
        );
        assert_eq!(
            absolutize("https://a.org/base/", "papers/y.pdf"),
            "https://a.org/base/papers/y.pdf"
        );
    }

    #[test]
    fn test_parse_papers_filters_non_paper_links() {
        let config = Config::default();
        let agent = ResearchAgent::new(config).unwrap();
        let html = r#"
            <a href="/about">About this venue and sponsors</a>
            <a href="/paper/deep-fuzzing-study">Deep Fuzzing of Network Protocol Stacks</a>
            <a href="/paper/deep-fuzzing-study">Deep Fuzzing of Network Protocol Stacks</a>
            <a href="papers/tee-attacks.pdf">Breaking Trusted Execution Environments</a>
        "#;
        let papers = agent.parse_papers(html, "https://example.org/conf");
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].title, "Deep Fuzzing of Network Protocol Stacks");
        assert!(papers[1].url.ends_with("tee-attacks.pdf"));
    }

    #[test]
    fn test_page_level_links_collapse_into_single_entry() {
        let html = r#"
            <a href="/paper/a">Analyzing Side Channels in Modern Hypervisors</a>
            artifact: https://github.com/org/sidechannel-kit
            <a href="/paper/b">Fuzzing Embedded Firmware at Scale</a>
            artifact: https://github.com/org/firmware-fuzzer
            mirror: https://github.com/org/sidechannel-kit
        "#;

        let aggregate = page_level_paper(Conference::Ccs, "2024", "https://x/ccs2024", html)
            .expect("page has links");
        // 页面级链接去重后只出现一次，不再按论文数量成倍复制
        assert_eq!(aggregate.github_links.len(), 2);
        assert_eq!(aggregate.title, "ccs 2024 proceedings page");

        assert!(page_level_paper(Conference::Ccs, "2024", "https://x", "no links here").is_none());
    }

    #[test]
    fn test_proceedings_url_per_conference() {
        let agent = ResearchAgent::new(Config::default()).unwrap();
        assert!(
            agent
                .proceedings_url(Conference::Ccs, "2023")
                .contains("ccs2023")
        );
        assert!(
            agent
                .proceedings_url(Conference::Usenix, "23")
                .contains("usenixsecurity23")
        );
    }
}
