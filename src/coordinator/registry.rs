use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::{Conference, Config};
use crate::coordinator::workflow::{WorkflowCoordinator, WorkflowSummary};

/// 任务状态机：PENDING -> RUNNING -> {COMPLETED | FAILED}。
/// 取消是带外路径，条目被直接移除，之后查询视为不存在
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "running")]
    Running,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// 任务提交请求
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub conference: Conference,
    pub year: String,
}

/// 对外可见的任务记录
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TaskRecord {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    /// 仅在completed时存在
    pub results: Option<WorkflowSummary>,
    /// 仅在failed时存在
    pub error: Option<String>,
}

/// 任务执行器接口，注册表通过它启动工作流。测试替身从这里注入
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, request: TaskRequest) -> Result<WorkflowSummary>;
}

/// 默认执行器：每个任务使用独立的协调器实例
struct WorkflowRunner {
    config: Config,
}

#[async_trait]
impl TaskRunner for WorkflowRunner {
    async fn run(&self, request: TaskRequest) -> Result<WorkflowSummary> {
        let mut coordinator = WorkflowCoordinator::new(self.config.clone())?;
        coordinator
            .process_papers(request.conference, &request.year)
            .await
    }
}

struct TaskEntry {
    record: Arc<RwLock<TaskRecord>>,
    handle: JoinHandle<()>,
}

/// 任务注册表：把同步的外部请求与长时间运行的工作流解耦，
/// 提供提交、轮询、取消三个操作
pub struct TaskRegistry {
    tasks: Arc<RwLock<HashMap<String, TaskEntry>>>,
    runner: Arc<dyn TaskRunner>,
}

impl TaskRegistry {
    pub fn new(config: Config) -> Self {
        Self::with_runner(Arc::new(WorkflowRunner { config }))
    }

    /// 以自定义执行器构造注册表
    pub fn with_runner(runner: Arc<dyn TaskRunner>) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            runner,
        }
    }

    /// 提交任务并立即返回任务ID，工作流在后台执行
    pub async fn submit(&self, request: TaskRequest) -> String {
        let task_id = generate_task_id();
        let record = Arc::new(RwLock::new(TaskRecord {
            task_id: task_id.clone(),
            status: TaskStatus::Pending,
            progress: 0.0,
            created_at: Utc::now(),
            results: None,
            error: None,
        }));

        let runner = Arc::clone(&self.runner);
        let task_record = Arc::clone(&record);
        let handle = tokio::spawn(async move {
            {
                let mut record = task_record.write().await;
                record.status = TaskStatus::Running;
                record.progress = 0.05;
            }

            match runner.run(request).await {
                Ok(summary) => {
                    let mut record = task_record.write().await;
                    record.status = TaskStatus::Completed;
                    record.progress = 1.0;
                    record.results = Some(summary);
                }
                Err(e) => {
                    let mut record = task_record.write().await;
                    record.status = TaskStatus::Failed;
                    record.error = Some(e.to_string());
                }
            }
        });

        let mut tasks = self.tasks.write().await;
        tasks.insert(task_id.clone(), TaskEntry { record, handle });
        task_id
    }

    /// 查询任务最新状态，未知ID返回None
    pub async fn get_status(&self, task_id: &str) -> Option<TaskRecord> {
        let tasks = self.tasks.read().await;
        let entry = tasks.get(task_id)?;
        Some(entry.record.read().await.clone())
    }

    /// 取消仍在活动中的任务。已完成、已失败或未知的任务返回false。
    /// 取消不回滚已合并的部分结果
    pub async fn cancel(&self, task_id: &str) -> bool {
        let mut tasks = self.tasks.write().await;
        let Some(entry) = tasks.get(task_id) else {
            return false;
        };

        if entry.record.read().await.status.is_terminal() {
            return false;
        }

        entry.handle.abort();
        tasks.remove(task_id);
        true
    }

    /// 当前跟踪的任务数，用于健康检查
    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }
}

/// 生成时间+随机标识派生的任务ID
fn generate_task_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!(
        "task_{}_{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        &uuid[..8]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// 可配置时长与结果的测试执行器
    struct StubRunner {
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl TaskRunner for StubRunner {
        async fn run(&self, request: TaskRequest) -> Result<WorkflowSummary> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                anyhow::bail!("stub failure");
            }
            Ok(WorkflowSummary {
                conference: request.conference,
                year: request.year,
                papers_analyzed: 0,
                repositories_analyzed: 0,
                average_quality_score: 0.0,
                documentation_sections: Vec::new(),
                processing_time_seconds: 0.0,
            })
        }
    }

    fn request() -> TaskRequest {
        TaskRequest {
            conference: Conference::Ccs,
            year: "2024".to_string(),
        }
    }

    async fn wait_for_terminal(registry: &TaskRegistry, task_id: &str) -> TaskRecord {
        for _ in 0..200 {
            if let Some(record) = registry.get_status(task_id).await
                && record.status.is_terminal()
            {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task never reached a terminal status");
    }

    #[tokio::test]
    async fn test_submit_and_poll_until_completed() {
        let registry = TaskRegistry::with_runner(Arc::new(StubRunner {
            delay: Duration::from_millis(10),
            fail: false,
        }));

        let task_id = registry.submit(request()).await;
        assert!(task_id.starts_with("task_"));

        let record = wait_for_terminal(&registry, &task_id).await;
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.progress, 1.0);
        assert!(record.results.is_some());
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn test_failed_task_carries_error() {
        let registry = TaskRegistry::with_runner(Arc::new(StubRunner {
            delay: Duration::from_millis(1),
            fail: true,
        }));

        let task_id = registry.submit(request()).await;
        let record = wait_for_terminal(&registry, &task_id).await;

        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("stub failure"));
        assert!(record.results.is_none());
    }

    #[tokio::test]
    async fn test_cancel_semantics() {
        let registry = TaskRegistry::with_runner(Arc::new(StubRunner {
            delay: Duration::from_secs(30),
            fail: false,
        }));

        // 未知ID
        assert!(!registry.cancel("task_unknown").await);

        let task_id = registry.submit(request()).await;
        // 活动任务只成功取消一次，之后视为不存在
        assert!(registry.cancel(&task_id).await);
        assert!(!registry.cancel(&task_id).await);
        assert!(registry.get_status(&task_id).await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_completed_task_returns_false() {
        let registry = TaskRegistry::with_runner(Arc::new(StubRunner {
            delay: Duration::from_millis(1),
            fail: false,
        }));

        let task_id = registry.submit(request()).await;
        wait_for_terminal(&registry, &task_id).await;

        assert!(!registry.cancel(&task_id).await);
        // 已完成的任务仍可查询
        assert!(registry.get_status(&task_id).await.is_some());
    }

    #[tokio::test]
    async fn test_task_ids_are_unique() {
        let registry = TaskRegistry::with_runner(Arc::new(StubRunner {
            delay: Duration::from_millis(1),
            fail: false,
        }));

        let a = registry.submit(request()).await;
        let b = registry.submit(request()).await;
        assert_ne!(a, b);
        assert_eq!(registry.task_count().await, 2);
    }
}
