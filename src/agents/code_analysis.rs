use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use regex::Regex;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::agents::StageAgent;
use crate::config::Config;
use crate::coordinator::context::AnalysisStage;
use crate::error::WorkflowError;
use crate::types::analysis::{
    AnalysisResults, DependencyAnalysis, QualityAnalysis, RepositoryAnalysis, RepositoryReport,
    SecurityAnalysis, StructureAnalysis, VulnerabilityFinding,
};

/// 可疑代码模式，按类别命名
static SECURITY_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "sql_injection",
            Regex::new(r#"exec\s*\(.*\$"#).expect("invalid pattern"),
        ),
        (
            "xss",
            Regex::new(r"innerHTML\s*=").expect("invalid pattern"),
        ),
        (
            "command_injection",
            Regex::new(r"eval\s*\(").expect("invalid pattern"),
        ),
        (
            "path_traversal",
            Regex::new(r"\.\./").expect("invalid pattern"),
        ),
        (
            "hardcoded_secret",
            Regex::new(r#"(?i)(api_key|password|secret)\s*=\s*["'][^"']{8,}["']"#)
                .expect("invalid pattern"),
        ),
    ]
});

/// 单仓库内保留的命中上限，避免报告体积失控
const MAX_FINDINGS_PER_REPO: usize = 200;

/// 源代码扩展名，参与行数与模式扫描
const CODE_EXTENSIONS: [&str; 14] = [
    "rs", "py", "c", "h", "cpp", "cc", "go", "js", "ts", "java", "rb", "php", "sh", "sol",
];

/// 负责代码仓库克隆与静态分析的智能体
pub struct CodeAnalysisAgent {
    config: Config,
    scratch_dir: PathBuf,
}

impl CodeAnalysisAgent {
    pub fn new(config: Config) -> Self {
        let scratch_dir = config.internal_path.join("repos");
        Self {
            config,
            scratch_dir,
        }
    }

    /// 分析单个仓库，失败返回Err由调用方决定跳过
    async fn analyze_repository(&self, repo_url: &str) -> Result<RepositoryAnalysis> {
        let repo_path = self.clone_repository(repo_url).await?;

        let report = self.scan_repository(&repo_path);

        // 无论扫描结果如何都清理克隆目录
        let cleanup = tokio::fs::remove_dir_all(&repo_path).await;
        if let Err(e) = cleanup {
            eprintln!("⚠️ 清理仓库目录失败 {}: {}", repo_path.display(), e);
        }

        Ok(RepositoryAnalysis {
            repo_url: repo_url.to_string(),
            analysis: report?,
        })
    }

    /// 为单次克隆生成独立的落盘路径。并发分析下同名仓库（a/tool与b/tool）
    /// 或被多篇论文共享的同一仓库不能共用目录，否则互相删除对方的工作区
    fn scratch_path(&self, repo_url: &str) -> PathBuf {
        let repo_name = repo_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|n| !n.is_empty())
            .unwrap_or("repo");
        let token = Uuid::new_v4().simple().to_string();
        self.scratch_dir
            .join(format!("{}_{}", repo_name, &token[..8]))
    }

    /// 浅克隆仓库到内部工作目录
    async fn clone_repository(&self, repo_url: &str) -> Result<PathBuf> {
        let repo_path = self.scratch_path(repo_url);
        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        if self.config.verbose {
            println!("⬇️ 克隆仓库: {}", repo_url);
        }

        let output = tokio::process::Command::new("git")
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg(repo_url)
            .arg(&repo_path)
            .output()
            .await
            .context("Failed to spawn git")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git clone failed for {}: {}", repo_url, stderr));
        }

        Ok(repo_path)
    }

    /// 对克隆目录执行四个维度的静态扫描
    fn scan_repository(&self, repo_path: &Path) -> Result<RepositoryReport> {
        let mut structure = StructureAnalysis::default();
        let mut security = SecurityAnalysis::default();
        let mut quality = QualityAnalysis::default();
        let mut comment_lines = 0usize;
        let mut code_files = 0usize;

        let excluded = &self.config.analysis.excluded_dirs;
        let walker = WalkDir::new(repo_path).into_iter().filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(entry.file_type().is_dir() && excluded.iter().any(|d| d == name.as_ref()))
        });

        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            structure.total_files += 1;
            structure.max_depth = structure.max_depth.max(entry.depth());

            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_else(|| "(none)".to_string());
            *structure.file_types.entry(ext.clone()).or_insert(0) += 1;

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let bucket = categorize_file_size(size);
            *structure
                .size_distribution
                .entry(bucket.to_string())
                .or_insert(0) += 1;

            let file_name = entry.file_name().to_string_lossy().to_lowercase();
            if file_name == "readme.md" || file_name == "readme.rst" || file_name == "readme" {
                quality.has_readme = true;
            }
            if file_name == "security.md" || file_name.contains("audit") {
                security
                    .security_measures
                    .push(relative_display(repo_path, path));
            }
            if file_name.starts_with("test") || path.to_string_lossy().contains("/tests/") {
                quality.has_tests = true;
            }

            // 超限文件与非源码文件不做内容扫描
            if size > self.config.analysis.max_file_size
                || !CODE_EXTENSIONS.contains(&ext.as_str())
            {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(path) else {
                continue;
            };

            code_files += 1;
            for (line_no, line) in content.lines().enumerate() {
                structure.total_lines += 1;
                let trimmed = line.trim_start();
                if trimmed.starts_with("//") || trimmed.starts_with('#') {
                    comment_lines += 1;
                }

                if security.vulnerabilities.len() >= MAX_FINDINGS_PER_REPO {
                    continue;
                }
                for (kind, pattern) in SECURITY_PATTERNS.iter() {
                    if pattern.is_match(line) {
                        security.vulnerabilities.push(VulnerabilityFinding {
                            kind: (*kind).to_string(),
                            file: relative_display(repo_path, path),
                            line: line_no + 1,
                        });
                    }
                }
            }
        }

        if structure.total_lines > 0 {
            quality.comment_ratio = comment_lines as f64 / structure.total_lines as f64;
        }
        if code_files > 0 {
            quality.avg_file_length = structure.total_lines as f64 / code_files as f64;
        }

        let dependency = self.scan_dependencies(repo_path);

        Ok(RepositoryReport {
            structure_analysis: structure,
            security_analysis: security,
            quality_analysis: quality,
            dependency_analysis: dependency,
        })
    }

    /// 解析常见manifest文件的直接依赖清单
    fn scan_dependencies(&self, repo_path: &Path) -> DependencyAnalysis {
        let mut manifests: HashMap<String, Vec<String>> = HashMap::new();

        if let Ok(content) = std::fs::read_to_string(repo_path.join("Cargo.toml")) {
            manifests.insert("Cargo.toml".to_string(), parse_cargo_dependencies(&content));
        }
        if let Ok(content) = std::fs::read_to_string(repo_path.join("requirements.txt")) {
            let deps = content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(|l| {
                    l.split(['=', '<', '>', '~', ';', ' '])
                        .next()
                        .unwrap_or(l)
                        .to_string()
                })
                .collect();
            manifests.insert("requirements.txt".to_string(), deps);
        }
        if let Ok(content) = std::fs::read_to_string(repo_path.join("package.json")) {
            let deps = serde_json::from_str::<serde_json::Value>(&content)
                .ok()
                .and_then(|v| {
                    v.get("dependencies")
                        .and_then(|d| d.as_object())
                        .map(|d| d.keys().cloned().collect::<Vec<_>>())
                })
                .unwrap_or_default();
            manifests.insert("package.json".to_string(), deps);
        }

        let direct_dependencies = manifests.values().map(|v| v.len()).sum();
        DependencyAnalysis {
            manifests,
            direct_dependencies,
        }
    }
}

#[async_trait]
impl StageAgent for CodeAnalysisAgent {
    type Input = Vec<String>;
    type Output = AnalysisResults;

    fn name(&self) -> &'static str {
        "CodeAnalysisAgent"
    }

    /// 分析一篇论文关联的全部仓库。单仓库失败跳过，全部失败则整批报错
    async fn process(&self, repo_urls: Self::Input) -> Result<Self::Output> {
        let mut analysis_results = Vec::new();
        let mut last_error = None;

        for repo_url in &repo_urls {
            match self.analyze_repository(repo_url).await {
                Ok(result) => analysis_results.push(result),
                Err(e) => {
                    eprintln!("❌ 仓库分析失败 [{}]: {}", repo_url, e);
                    last_error = Some(e);
                }
            }
        }

        if analysis_results.is_empty() && !repo_urls.is_empty() {
            let source = last_error.unwrap_or_else(|| anyhow!("no repositories analyzed"));
            return Err(WorkflowError::collaborator_with_source(
                AnalysisStage::CodeAnalysis,
                format!("all {} repositories failed analysis", repo_urls.len()),
                source,
            )
            .into());
        }

        Ok(AnalysisResults {
            repositories_analyzed: analysis_results.len(),
            analysis_results,
        })
    }
}

fn categorize_file_size(size: u64) -> &'static str {
    match size {
        0..=10_240 => "small",
        10_241..=102_400 => "medium",
        _ => "large",
    }
}

fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

/// 提取Cargo.toml的[dependencies]段依赖名
fn parse_cargo_dependencies(content: &str) -> Vec<String> {
    let mut deps = Vec::new();
    let mut in_dependencies = false;
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }
        if in_dependencies && !line.is_empty() && !line.starts_with('#') {
            if let Some(name) = line.split('=').next() {
                let name = name.trim();
                if !name.is_empty() {
                    deps.push(name.to_string());
                }
            }
        }
    }
    deps
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn agent_for(dir: &TempDir) -> CodeAnalysisAgent {
        let config = Config {
            internal_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        CodeAnalysisAgent::new(config)
    }

    #[test]
    fn test_scan_repository_structure_and_quality() {
        let temp_dir = TempDir::new().unwrap();
        let repo = temp_dir.path().join("repo");
        fs::create_dir_all(repo.join("src")).unwrap();
        fs::write(repo.join("README.md"), "# demo").unwrap();
        fs::write(
            repo.join("src/main.rs"),
            "// entry point\nfn main() {\n    println!(\"hi\");\n}\n",
        )
        .unwrap();
        fs::write(repo.join("src/test_utils.rs"), "fn helper() {}\n").unwrap();

        let agent = agent_for(&temp_dir);
        let report = agent.scan_repository(&repo).unwrap();

        assert_eq!(report.structure_analysis.total_files, 3);
        assert_eq!(report.structure_analysis.file_types.get("rs"), Some(&2));
        assert!(report.quality_analysis.has_readme);
        assert!(report.quality_analysis.has_tests);
        assert!(report.quality_analysis.comment_ratio > 0.0);
    }

    #[test]
    fn test_scan_repository_flags_suspicious_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let repo = temp_dir.path().join("repo");
        fs::create_dir_all(&repo).unwrap();
        fs::write(
            repo.join("app.js"),
            "element.innerHTML = payload;\nlet out = eval(expr);\n",
        )
        .unwrap();

        let agent = agent_for(&temp_dir);
        let report = agent.scan_repository(&repo).unwrap();

        let kinds: Vec<_> = report
            .security_analysis
            .vulnerabilities
            .iter()
            .map(|v| v.kind.as_str())
            .collect();
        assert!(kinds.contains(&"xss"));
        assert!(kinds.contains(&"command_injection"));
    }

    #[test]
    fn test_scan_dependencies_cargo_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let repo = temp_dir.path().join("repo");
        fs::create_dir_all(&repo).unwrap();
        fs::write(
            repo.join("Cargo.toml"),
            "[package]\nname = \"x\"\n\n[dependencies]\nserde = \"1.0\"\ntokio = { version = \"1\" }\n",
        )
        .unwrap();

        let agent = agent_for(&temp_dir);
        let deps = agent.scan_dependencies(&repo);

        assert_eq!(deps.direct_dependencies, 2);
        assert_eq!(
            deps.manifests.get("Cargo.toml"),
            Some(&vec!["serde".to_string(), "tokio".to_string()])
        );
    }

    #[test]
    fn test_scratch_paths_never_collide() {
        let temp_dir = TempDir::new().unwrap();
        let agent = agent_for(&temp_dir);

        // 不同组织下的同名仓库
        assert_ne!(
            agent.scratch_path("https://github.com/a/tool"),
            agent.scratch_path("https://github.com/b/tool")
        );
        // 同一仓库被两篇论文并发引用时，各自拿到独立工作区
        assert_ne!(
            agent.scratch_path("https://github.com/a/tool"),
            agent.scratch_path("https://github.com/a/tool")
        );
    }

    #[tokio::test]
    async fn test_process_empty_link_list() {
        let temp_dir = TempDir::new().unwrap();
        let agent = agent_for(&temp_dir);

        let results = agent.process(Vec::new()).await.unwrap();
        assert_eq!(results.repositories_analyzed, 0);
        assert!(results.analysis_results.is_empty());
    }
}
