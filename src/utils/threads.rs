use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

/// 带并发上限地执行一组异步任务，返回顺序与输入一致
pub async fn do_parallel_with_limit<F, T>(tasks: Vec<F>, max_parallels: usize) -> Vec<T>
where
    F: Future<Output = T> + Send,
    T: Send,
{
    let semaphore = Arc::new(Semaphore::new(max_parallels.max(1)));

    let guarded: Vec<_> = tasks
        .into_iter()
        .map(|task| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                // 信号量在本函数生命周期内不会被关闭
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                task.await
            }
        })
        .collect();

    join_all(guarded).await
}
