use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{OriginalUri, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{Conference, Config};
use crate::coordinator::registry::{TaskRegistry, TaskRequest};

/// HTTP层共享状态
#[derive(Clone)]
struct ApiState {
    registry: Arc<TaskRegistry>,
}

/// 分析请求体
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub paper_url: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub analysis_config: Option<Value>,
    #[serde(default)]
    #[allow(dead_code)]
    pub priority: Option<String>,
}

/// 分析请求响应
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub task_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub estimated_completion_time: DateTime<Utc>,
}

/// 统一错误信封
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: String,
    timestamp: DateTime<Utc>,
    path: String,
}

struct ApiError {
    status: StatusCode,
    message: String,
    path: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>, path: &OriginalUri) -> Self {
        Self {
            status,
            message: message.into(),
            path: path.path().to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope {
            error: self.message,
            timestamp: Utc::now(),
            path: self.path,
        };
        (self.status, Json(envelope)).into_response()
    }
}

/// 启动论文分析任务
async fn start_analysis(
    State(state): State<ApiState>,
    uri: OriginalUri,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let task_request = parse_paper_url(&request.paper_url)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e, &uri))?;

    let task_id = state.registry.submit(task_request).await;
    let created_at = Utc::now();

    Ok(Json(AnalyzeResponse {
        task_id,
        status: "accepted".to_string(),
        created_at,
        estimated_completion_time: created_at + Duration::minutes(30),
    }))
}

/// 获取任务状态
async fn get_task_status(
    State(state): State<ApiState>,
    uri: OriginalUri,
    Path(task_id): Path<String>,
) -> Result<Response, ApiError> {
    match state.registry.get_status(&task_id).await {
        Some(record) => Ok(Json(record).into_response()),
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "Task not found",
            &uri,
        )),
    }
}

/// 取消任务
async fn cancel_task(
    State(state): State<ApiState>,
    uri: OriginalUri,
    Path(task_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.registry.cancel(&task_id).await {
        Ok(Json(
            serde_json::json!({ "message": "Task cancelled successfully" }),
        ))
    } else {
        Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "Task not found or already completed",
            &uri,
        ))
    }
}

/// 获取分析结果，未完成返回400
async fn get_results(
    State(state): State<ApiState>,
    uri: OriginalUri,
    Path(task_id): Path<String>,
) -> Result<Response, ApiError> {
    let Some(record) = state.registry.get_status(&task_id).await else {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "Results not found",
            &uri,
        ));
    };

    match record.results {
        Some(results) => Ok(Json(results).into_response()),
        None => Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Analysis not yet completed",
            &uri,
        )),
    }
}

/// 健康检查
async fn health_check(State(state): State<ApiState>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "active_tasks": state.registry.task_count().await,
    }))
}

fn build_router(registry: Arc<TaskRegistry>) -> Router {
    let state = ApiState { registry };
    Router::new()
        .route("/analyze", post(start_analysis))
        .route("/task/{task_id}", get(get_task_status))
        .route("/task/{task_id}", delete(cancel_task))
        .route("/results/{task_id}", get(get_results))
        .route("/health", get(health_check))
        .with_state(state)
}

/// 运行HTTP服务直到进程退出
pub async fn serve(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let registry = Arc::new(TaskRegistry::new(config));
    let app = build_router(registry);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    println!("🌐 HTTP服务已启动: http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server exited with error")?;
    Ok(())
}

/// 从论文地址推断会议与年份。无法识别时报错，由调用方转为400
fn parse_paper_url(paper_url: &str) -> Result<TaskRequest, String> {
    let lowered = paper_url.to_lowercase();
    let conference = if lowered.contains("ccs") || lowered.contains("dl.acm.org") {
        Conference::Ccs
    } else if lowered.contains("ieee") || has_sp_edition_segment(&lowered) {
        Conference::Sp
    } else if lowered.contains("ndss") {
        Conference::Ndss
    } else if lowered.contains("usenix") {
        Conference::Usenix
    } else {
        return Err(format!(
            "Cannot infer a supported conference from url: {}",
            paper_url
        ));
    };

    let year = extract_year(&lowered)
        .ok_or_else(|| format!("Cannot infer a year from url: {}", paper_url))?;

    Ok(TaskRequest { conference, year })
}

/// 是否存在形如 sp2024 / sp24 的届次片段。
/// 裸 "/sp" 前缀匹配会把 /spray、/specs 之类的路径误判成S&P
fn has_sp_edition_segment(url: &str) -> bool {
    url.split(['/', '.', '-', '_']).any(|segment| {
        segment
            .strip_prefix("sp")
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    })
}

/// 提取地址中的届次年份：优先四位年份，其次会议名后跟的两位数字
fn extract_year(url: &str) -> Option<String> {
    let bytes = url.as_bytes();
    let digit_runs = url
        .char_indices()
        .filter(|(_, c)| c.is_ascii_digit())
        .fold(Vec::<(usize, usize)>::new(), |mut runs, (i, _)| {
            match runs.last_mut() {
                Some((_, end)) if *end == i => *end += 1,
                _ => runs.push((i, i + 1)),
            }
            runs
        });

    for (start, end) in &digit_runs {
        if end - start == 4 && bytes[*start] == b'2' {
            return Some(url[*start..*end].to_string());
        }
    }
    for (start, end) in &digit_runs {
        if end - start == 2 {
            return Some(url[*start..*end].to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paper_url_recognizes_conferences() {
        let request = parse_paper_url("https://dl.acm.org/doi/10.1145/ccs2024.12345").unwrap();
        assert_eq!(request.conference, Conference::Ccs);
        assert_eq!(request.year, "2024");

        let request =
            parse_paper_url("https://www.usenix.org/conference/usenixsecurity23/paper-x").unwrap();
        assert_eq!(request.conference, Conference::Usenix);
        assert_eq!(request.year, "23");
    }

    #[test]
    fn test_parse_paper_url_rejects_unknown_venue() {
        assert!(parse_paper_url("https://example.org/paper/1").is_err());
        assert!(parse_paper_url("https://www.ndss-symposium.org/paper-without-year").is_err());
    }

    #[test]
    fn test_parse_paper_url_sp_requires_edition_segment() {
        let request = parse_paper_url("https://conf.example.org/sp2024/paper-7").unwrap();
        assert_eq!(request.conference, Conference::Sp);

        // sp开头但不是届次片段的路径不能被误判成S&P
        assert!(parse_paper_url("https://example.org/spray2024/paper").is_err());
        assert!(parse_paper_url("https://example.org/specs/2024").is_err());
    }

    #[test]
    fn test_extract_year_prefers_four_digits() {
        assert_eq!(extract_year("ndss2023/paper-42").as_deref(), Some("2023"));
        assert_eq!(extract_year("usenixsecurity23").as_deref(), Some("23"));
        assert_eq!(extract_year("no-digits-here"), None);
    }
}
