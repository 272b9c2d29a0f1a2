use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::CacheManager;
use crate::config::{AnalysisDepth, Conference, Config, OutputFormat};
use crate::coordinator::workflow::launch;
use crate::error::WorkflowError;

/// SecuriPaper-RS - 安全会议论文与代码仓库分析引擎
#[derive(Parser, Debug)]
#[command(name = "securipaper-rs")]
#[command(
    about = "Multi-agent analysis engine for security-conference papers. It discovers papers, extracts linked code repositories, analyzes their quality, and generates assessment documentation."
)]
#[command(author = "Sopaco")]
#[command(version)]
pub struct Args {
    /// 会议名 (ccs, sp, ndss, usenix)
    #[arg(long)]
    pub conference: Option<String>,

    /// 届次年份，如 "23" 表示2023
    #[arg(long)]
    pub year: Option<String>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 输出目录
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// 分析深度 (basic, detailed, comprehensive)
    #[arg(long, default_value = "detailed")]
    pub depth: String,

    /// 是否并行分析各论文的仓库
    #[arg(long)]
    pub parallel: bool,

    /// 输出格式 (markdown, html, pdf)
    #[arg(long, default_value = "markdown")]
    pub format: String,

    /// 是否启用调试日志
    #[arg(long)]
    pub debug: bool,

    /// 运行前清空缓存
    #[arg(long)]
    pub clean_cache: bool,

    /// 以HTTP服务方式运行
    #[arg(long)]
    pub serve: bool,

    /// HTTP服务端口
    #[arg(long)]
    pub port: Option<u16>,
}

impl Args {
    /// 将CLI参数转换为配置
    pub fn into_config(self) -> anyhow::Result<Config> {
        let mut config = if let Some(config_path) = &self.config {
            // 显式指定了配置文件路径，从该路径加载
            Config::from_file(config_path)?
        } else {
            // 尝试从默认位置加载
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("securipaper.toml");

            if default_config_path.exists() {
                Config::from_file(&default_config_path)?
            } else {
                Config::default()
            }
        };

        // 命令行参数优先于配置文件
        if let Some(output_dir) = self.output_dir {
            config.output_path = output_dir;
        }
        if let Ok(depth) = AnalysisDepth::from_str(&self.depth) {
            config.analysis.depth = depth;
        } else {
            eprintln!("⚠️ 警告: 未知的分析深度: {}，使用默认值", self.depth);
        }
        if let Ok(format) = OutputFormat::from_str(&self.format) {
            config.output_format = format;
        } else {
            eprintln!("⚠️ 警告: 未知的输出格式: {}，使用默认值", self.format);
        }
        if self.parallel {
            config.analysis.parallel = true;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        config.verbose = self.debug;

        Ok(config)
    }
}

/// 命令行主流程，返回进程退出码
pub async fn run(args: Args) -> i32 {
    let conference_arg = args.conference.clone();
    let year_arg = args.year.clone();
    let serve = args.serve;
    let clean_cache = args.clean_cache;

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ 配置加载失败: {}", e);
            return 1;
        }
    };

    if clean_cache {
        println!("🧹 清理缓存...");
        let cache = CacheManager::new(config.cache.clone());
        if let Err(e) = cache.clean().await {
            eprintln!("⚠️ 缓存清理失败: {}", e);
        }
    }

    if serve {
        return match crate::api::serve(config).await {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("❌ HTTP服务异常退出: {}", e);
                1
            }
        };
    }

    // 单次分析模式下conference与year必填
    let (Some(conference_str), Some(year)) = (conference_arg, year_arg) else {
        eprintln!("❌ 错误: --conference 与 --year 均为必填参数");
        return 1;
    };
    let conference = match Conference::from_str(&conference_str) {
        Ok(conference) => conference,
        Err(e) => {
            let err = WorkflowError::Configuration(e);
            eprintln!("❌ {}", err);
            return 1;
        }
    };

    tokio::select! {
        result = launch(&config, conference, &year) => match result {
            Ok(summary) => {
                println!(
                    "📄 文档章节: {}，耗时{:.1}秒",
                    summary.documentation_sections.join(", "),
                    summary.processing_time_seconds
                );
                0
            }
            Err(e) => {
                eprintln!("❌ 分析失败: {}", e);
                1
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("🛑 收到中断信号，分析终止");
            130
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
