use std::future::Future;
use std::time::Duration;

use anyhow::Result;

use crate::config::RetryConfig;
use crate::error::WorkflowError;

/// 通用重试逻辑：有界尝试次数，指数退避，耗尽后以RetryExhausted带源错误上抛
pub async fn retry_with_backoff<T, F, Fut>(
    config: &RetryConfig,
    label: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut delay = Duration::from_millis(config.base_delay_ms);
    let mut attempts = 0u32;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                attempts += 1;
                if attempts >= max_attempts {
                    return Err(WorkflowError::RetryExhausted {
                        attempts,
                        source: err,
                    }
                    .into());
                }
                eprintln!(
                    "❌ {} 执行出错，重试中 (第 {} / {} 次尝试): {}",
                    label, attempts, max_attempts, err
                );
                tokio::time::sleep(delay).await;
                // 指数退避，延迟逐次翻倍
                delay *= 2;
            }
        }
    }
}
