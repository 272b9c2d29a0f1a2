use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// 支持的安全会议，闭合枚举
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Conference {
    #[serde(rename = "ccs")]
    #[default]
    Ccs,
    #[serde(rename = "sp")]
    Sp,
    #[serde(rename = "ndss")]
    Ndss,
    #[serde(rename = "usenix")]
    Usenix,
}

impl std::fmt::Display for Conference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conference::Ccs => write!(f, "ccs"),
            Conference::Sp => write!(f, "sp"),
            Conference::Ndss => write!(f, "ndss"),
            Conference::Usenix => write!(f, "usenix"),
        }
    }
}

impl std::str::FromStr for Conference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ccs" => Ok(Conference::Ccs),
            "sp" => Ok(Conference::Sp),
            "ndss" => Ok(Conference::Ndss),
            "usenix" => Ok(Conference::Usenix),
            _ => Err(format!("Unsupported conference: {}", s)),
        }
    }
}

/// 分析深度
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisDepth {
    #[serde(rename = "basic")]
    Basic,
    #[serde(rename = "detailed")]
    #[default]
    Detailed,
    #[serde(rename = "comprehensive")]
    Comprehensive,
}

impl std::str::FromStr for AnalysisDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(AnalysisDepth::Basic),
            "detailed" => Ok(AnalysisDepth::Detailed),
            "comprehensive" => Ok(AnalysisDepth::Comprehensive),
            _ => Err(format!("Unknown analysis depth: {}", s)),
        }
    }
}

/// 文档输出格式
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[serde(rename = "markdown")]
    #[default]
    Markdown,
    #[serde(rename = "html")]
    Html,
    #[serde(rename = "pdf")]
    Pdf,
}

impl OutputFormat {
    /// 输出文件扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
            OutputFormat::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Html => write!(f, "html"),
            OutputFormat::Pdf => write!(f, "pdf"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            "pdf" => Ok(OutputFormat::Pdf),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// 输出路径
    pub output_path: PathBuf,

    /// 内部工作目录路径 (.securipaper)，存放克隆仓库等临时产物
    pub internal_path: PathBuf,

    /// 文档输出格式
    pub output_format: OutputFormat,

    /// 研究阶段配置
    pub research: ResearchConfig,

    /// 代码分析配置
    pub analysis: AnalysisConfig,

    /// 重试策略配置
    pub retry: RetryConfig,

    /// 缓存配置
    pub cache: CacheConfig,

    /// HTTP服务配置
    pub server: ServerConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// 研究阶段（论文发现与链接提取）配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResearchConfig {
    /// ACM数字图书馆基地址（CCS）
    pub acm_base_url: String,

    /// IEEE Xplore基地址（S&P）
    pub ieee_base_url: String,

    /// NDSS官网基地址
    pub ndss_base_url: String,

    /// USENIX官网基地址
    pub usenix_base_url: String,

    /// 抓取请求超时（秒）
    pub request_timeout_seconds: u64,
}

/// 代码分析配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnalysisConfig {
    /// 分析深度
    pub depth: AnalysisDepth,

    /// 是否并行分析各论文的仓库
    pub parallel: bool,

    /// 并发下载/分析上限（信号量上界）
    pub max_concurrent_downloads: usize,

    /// 参与扫描的最大文件大小（字节）
    pub max_file_size: u64,

    /// 扫描时排除的目录
    pub excluded_dirs: Vec<String>,
}

/// 重试策略配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetryConfig {
    /// 最大尝试次数（含首次）
    pub max_attempts: u32,

    /// 首次重试前的基础延迟（毫秒），之后逐次翻倍
    pub base_delay_ms: u64,
}

/// 缓存配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// 是否启用缓存
    pub enabled: bool,

    /// 缓存目录
    pub cache_dir: PathBuf,

    /// 缓存过期时间（小时）
    pub expire_hours: u64,
}

/// HTTP服务配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./securipaper.out"),
            internal_path: PathBuf::from("./.securipaper"),
            output_format: OutputFormat::Markdown,
            research: ResearchConfig::default(),
            analysis: AnalysisConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            server: ServerConfig::default(),
            verbose: false,
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            acm_base_url: "https://dl.acm.org/doi/proceedings/10.1145".to_string(),
            ieee_base_url: "https://ieeexplore.ieee.org/xpl/conhome".to_string(),
            ndss_base_url: "https://www.ndss-symposium.org".to_string(),
            usenix_base_url: "https://www.usenix.org/conference".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            depth: AnalysisDepth::Detailed,
            parallel: false,
            max_concurrent_downloads: 5,
            max_file_size: 1024 * 1024,
            excluded_dirs: vec![
                ".git".to_string(),
                "node_modules".to_string(),
                "target".to_string(),
                "vendor".to_string(),
                "__pycache__".to_string(),
            ],
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: PathBuf::from("./.securipaper/cache"),
            expire_hours: 24 * 7,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8460,
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
