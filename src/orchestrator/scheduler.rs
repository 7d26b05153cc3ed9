//! 有界并发调度器 - 编排层
//!
//! ## 职责
//!
//! 1. **准入控制**：用 Semaphore 限制同时执行的尝试数，按输入顺序准入
//!    （FIFO），一个尝试结束立刻放行下一个（不分批等待）
//! 2. **硬超时**：每趟尝试作为独立任务和计时器赛跑，超时即按失败处理，
//!    即使底层交互还在后台运行
//! 3. **有界重试**：失败趟（含超时、任务异常）最多追加 max_retries 次，
//!    趟间等待固定的 retry_delay
//! 4. **进度上报**：每条记录终局时推进完成计数并触发进度回调
//! 5. **单写者**：批次状态只由收集循环修改
//!
//! 调度器不做任何业务判定，交互与判定全部委托给流程层的执行端口。
//! 单条记录的彻底失败绝不中断批次；所有记录都有终局结果后调度器返回。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::models::{AttemptOutcome, AttemptResult, AttemptStatus, BatchState, Record, RunParams};
use crate::workflow::{AttemptCtx, AttemptRunner};

/// 运行一个批次
///
/// 每条记录恰好产生一个终局结果；完成顺序不确定，由汇总器恢复输入顺序。
pub async fn run_batch(
    runner: Arc<dyn AttemptRunner>,
    records: Vec<Record>,
    batch_id: &str,
    artifact_dir: &Path,
    params: RunParams,
    progress: impl Fn(usize, usize),
) -> Vec<AttemptResult> {
    let total = records.len();
    if total == 0 {
        return Vec::new();
    }

    let mut state = BatchState::new(total);
    let semaphore = Arc::new(Semaphore::new(params.concurrency_limit.max(1)));
    let (tx, mut rx) = mpsc::unbounded_channel::<AttemptResult>();

    // 准入任务：按输入顺序获取许可（FIFO）
    let admission = {
        let batch_id = batch_id.to_string();
        let artifact_dir = artifact_dir.to_path_buf();
        let runner = runner.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            for record in records {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let ctx = AttemptCtx::new(record.index, batch_id.clone(), artifact_dir.clone());
                let runner = runner.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    let result = run_with_retry(runner, record, ctx, params).await;
                    let _ = tx.send(result);
                });
            }
        })
    };
    drop(tx);

    // 收集循环：批次状态的唯一写者
    while let Some(result) = rx.recv().await {
        info!(
            "[记录 {}] ⏹ 终局: {} (共 {} 趟)",
            result.index, result.status, result.passes
        );
        state.record(result);
        progress(state.completed, state.total);
    }

    let _ = admission.await;
    state.into_results()
}

/// 单条记录的重试循环
///
/// 最多执行 `1 + max_retries` 趟；判定结论（匹配 / 不匹配 / 无法判定）
/// 直接终局，只有失败趟才消耗重试预算。
async fn run_with_retry(
    runner: Arc<dyn AttemptRunner>,
    record: Record,
    ctx: AttemptCtx,
    params: RunParams,
) -> AttemptResult {
    let total_passes = params.max_retries + 1;
    let attempt_timeout = Duration::from_millis(params.attempt_timeout_ms);
    let retry_delay = Duration::from_millis(params.retry_delay_ms);

    let mut last_message = None;
    let mut last_artifact = None;

    for pass in 1..=total_passes {
        if pass > 1 {
            debug!(
                "[记录 {}] 🔁 等待 {} ms 后进行第 {}/{} 趟",
                record.index, params.retry_delay_ms, pass, total_passes
            );
            sleep(retry_delay).await;
        }

        // 尝试作为独立任务和计时器赛跑；输掉的一方也要被清理：
        // 超时后中止任务，会话由守卫异步释放
        let runner = runner.clone();
        let rec = record.clone();
        let attempt_ctx = ctx.clone();
        let mut handle = tokio::spawn(async move { runner.attempt(&rec, &attempt_ctx).await });

        let outcome = match timeout(attempt_timeout, &mut handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => {
                AttemptOutcome::failed(format!("尝试任务异常终止: {}", join_error))
            }
            Err(_) => {
                handle.abort();
                warn!(
                    "[记录 {}] ⏰ 第 {}/{} 趟超时 (上限 {} ms)",
                    record.index, pass, total_passes, params.attempt_timeout_ms
                );
                AttemptOutcome::failed(format!(
                    "timeout: 超过 {} ms 未完成",
                    params.attempt_timeout_ms
                ))
            }
        };

        if outcome.status.is_verdict() {
            return AttemptResult {
                index: record.index,
                status: outcome.status,
                artifact: outcome.artifact,
                message: outcome.message,
                passes: pass,
            };
        }

        last_message = outcome.message;
        last_artifact = outcome.artifact;
    }

    warn!(
        "[记录 {}] ❌ 重试耗尽 ({} 趟)，按失败终局",
        record.index, total_passes
    );
    AttemptResult {
        index: record.index,
        status: AttemptStatus::Failed,
        artifact: last_artifact,
        message: last_message,
        passes: total_passes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    fn make_records(n: usize) -> Vec<Record> {
        (1..=n)
            .map(|i| Record {
                index: i,
                last_name: format!("Name{}", i),
                dob: "02/23/1961".to_string(),
                zip: "30331".to_string(),
                last4: "9631".to_string(),
            })
            .collect()
    }

    fn params(
        concurrency_limit: usize,
        attempt_timeout_ms: u64,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> RunParams {
        RunParams {
            concurrency_limit,
            attempt_timeout_ms,
            max_retries,
            retry_delay_ms,
        }
    }

    /// 固定结论的执行器，顺带观测并发度和调用次数
    struct CountingRunner {
        status: AttemptStatus,
        delay: Duration,
        calls: AtomicUsize,
        current: AtomicUsize,
        max_seen: AtomicUsize,
    }

    impl CountingRunner {
        fn new(status: AttemptStatus, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                status,
                delay,
                calls: AtomicUsize::new(0),
                current: AtomicUsize::new(0),
                max_seen: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AttemptRunner for CountingRunner {
        async fn attempt(&self, _record: &Record, _ctx: &AttemptCtx) -> AttemptOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let running = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(running, Ordering::SeqCst);
            sleep(self.delay).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            if self.status == AttemptStatus::Failed {
                AttemptOutcome::failed("注定失败")
            } else {
                AttemptOutcome::new(self.status)
            }
        }
    }

    /// 永不返回的执行器（模拟卡死的交互）
    struct HangingRunner;

    #[async_trait]
    impl AttemptRunner for HangingRunner {
        async fn attempt(&self, _record: &Record, _ctx: &AttemptCtx) -> AttemptOutcome {
            sleep(Duration::from_secs(3600)).await;
            AttemptOutcome::new(AttemptStatus::Matched)
        }
    }

    #[tokio::test]
    async fn test_concurrency_cap_is_respected() {
        let runner = CountingRunner::new(AttemptStatus::Matched, Duration::from_millis(20));
        let results = run_batch(
            runner.clone(),
            make_records(12),
            "batch_t",
            Path::new("artifacts"),
            params(3, 5_000, 0, 0),
            |_, _| {},
        )
        .await;

        assert_eq!(results.len(), 12);
        assert!(
            runner.max_seen.load(Ordering::SeqCst) <= 3,
            "并发峰值 {} 超过上限 3",
            runner.max_seen.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn test_every_record_gets_exactly_one_result() {
        let runner = CountingRunner::new(AttemptStatus::Matched, Duration::from_millis(1));
        let results = run_batch(
            runner,
            make_records(10),
            "batch_t",
            Path::new("artifacts"),
            params(4, 5_000, 2, 1),
            |_, _| {},
        )
        .await;

        let mut indexes: Vec<usize> = results.iter().map(|r| r.index).collect();
        indexes.sort_unstable();
        assert_eq!(indexes, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_hanging_attempt_is_finalized_within_timeout_bound() {
        let start = Instant::now();
        let results = run_batch(
            Arc::new(HangingRunner),
            make_records(1),
            "batch_t",
            Path::new("artifacts"),
            params(1, 50, 1, 10),
            |_, _| {},
        )
        .await;

        assert!(
            start.elapsed() < Duration::from_secs(2),
            "卡死的尝试必须在超时上限附近被终局"
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, AttemptStatus::Failed);
        assert_eq!(results[0].passes, 2);
        assert!(results[0].message.as_deref().unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn test_retry_exhaustion_runs_exactly_one_plus_max_retries_passes() {
        let runner = CountingRunner::new(AttemptStatus::Failed, Duration::from_millis(1));
        let results = run_batch(
            runner.clone(),
            make_records(1),
            "batch_t",
            Path::new("artifacts"),
            params(1, 5_000, 2, 1),
            |_, _| {},
        )
        .await;

        assert_eq!(runner.calls.load(Ordering::SeqCst), 3, "应当恰好执行 3 趟");
        assert_eq!(results[0].passes, 3);
        assert_eq!(results[0].status, AttemptStatus::Failed);
        assert!(results[0].message.as_deref().unwrap().contains("注定失败"));
    }

    #[tokio::test]
    async fn test_verdict_is_not_retried() {
        // 无法判定是结论而不是失败，不应消耗重试预算
        let runner = CountingRunner::new(AttemptStatus::Indeterminate, Duration::from_millis(1));
        let results = run_batch(
            runner.clone(),
            make_records(1),
            "batch_t",
            Path::new("artifacts"),
            params(1, 5_000, 3, 1),
            |_, _| {},
        )
        .await;

        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(results[0].status, AttemptStatus::Indeterminate);
        assert_eq!(results[0].passes, 1);
    }

    #[tokio::test]
    async fn test_progress_callback_fires_per_completion() {
        let runner = CountingRunner::new(AttemptStatus::Matched, Duration::from_millis(1));
        let seen: Mutex<Vec<(usize, usize)>> = Mutex::new(Vec::new());

        run_batch(
            runner,
            make_records(5),
            "batch_t",
            Path::new("artifacts"),
            params(2, 5_000, 0, 0),
            |done, total| seen.lock().unwrap().push((done, total)),
        )
        .await;

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen.last(), Some(&(5, 5)));
        let dones: Vec<usize> = seen.iter().map(|(done, _)| *done).collect();
        assert_eq!(dones, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_empty_batch_returns_immediately() {
        let runner = CountingRunner::new(AttemptStatus::Matched, Duration::from_millis(1));
        let results = run_batch(
            runner.clone(),
            Vec::new(),
            "batch_t",
            Path::new("artifacts"),
            params(2, 5_000, 0, 0),
            |_, _| {},
        )
        .await;

        assert!(results.is_empty());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_failure_does_not_abort_batch() {
        // 一条记录彻底失败，其余记录照常终局
        struct FailFirstRunner;

        #[async_trait]
        impl AttemptRunner for FailFirstRunner {
            async fn attempt(&self, record: &Record, _ctx: &AttemptCtx) -> AttemptOutcome {
                if record.index == 1 {
                    AttemptOutcome::failed("首条注定失败")
                } else {
                    AttemptOutcome::new(AttemptStatus::Matched)
                }
            }
        }

        let results = run_batch(
            Arc::new(FailFirstRunner),
            make_records(4),
            "batch_t",
            Path::new("artifacts"),
            params(2, 5_000, 1, 1),
            |_, _| {},
        )
        .await;

        assert_eq!(results.len(), 4);
        let failed: Vec<usize> = results
            .iter()
            .filter(|r| r.status == AttemptStatus::Failed)
            .map(|r| r.index)
            .collect();
        assert_eq!(failed, vec![1]);
    }
}
