use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::probe::ProbeError;
use crate::services::registry::Storage;

/// 对所有启用健康检查的服务并发执行一轮探测。
///
/// 每个探针在独立任务中运行，成功后在写锁下回写存活状态。
/// 第一个探针错误会立即作为本轮结果返回，其余任务照常跑完，不会被取消。
/// 没有错误时等所有任务结束才返回。
pub async fn run_pass(storage: &Storage) -> Result<(), ProbeError> {
    let targets = storage.enabled_probes().await;
    if targets.is_empty() {
        return Ok(());
    }

    tracing::debug!(probe_count = targets.len(), "Starting health check pass");

    let tracker = TaskTracker::new();
    // 容量等于任务数，try_send 不会因满而丢错误
    let (error_tx, mut error_rx) = mpsc::channel::<ProbeError>(targets.len());

    for (id, probe) in targets {
        let storage = storage.clone();
        let error_tx = error_tx.clone();
        tracker.spawn(async move {
            match probe.check().await {
                Ok(alive) => {
                    if !storage.update_liveness(id, alive).await {
                        tracing::debug!(service_id = %id, "Service deregistered during probe");
                    }
                }
                Err(e) => {
                    tracing::warn!(service_id = %id, error = %e, "Health probe failed");
                    let _ = error_tx.try_send(e);
                }
            }
        });
    }
    drop(error_tx);
    tracker.close();

    tokio::select! {
        Some(err) = error_rx.recv() => Err(err),
        _ = tracker.wait() => match error_rx.try_recv() {
            Ok(err) => Err(err),
            Err(_) => Ok(()),
        },
    }
}

/// 健康检查循环：每轮前短暂延迟，之后按固定间隔重复。
///
/// 任一轮返回错误即视为致命：取消 `shutdown` 并把错误交给调用方。
pub async fn run_tick_loop(
    storage: Storage,
    interval: Duration,
    pass_delay: Duration,
    shutdown: CancellationToken,
) -> Result<(), ProbeError> {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(pass_delay) => {}
        }

        if let Err(e) = run_pass(&storage).await {
            tracing::error!(error = %e, "Health check pass failed, shutting down server");
            shutdown.cancel();
            return Err(e);
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::debug!("Health check loop stopped");
    Ok(())
}
