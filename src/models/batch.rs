//! 批次状态与汇总
//!
//! [`BatchState`] 的生命周期等于一次批次运行，只由调度器的收集循环修改
//! （单写者），汇总产出后即丢弃；[`BatchSummary`] 是持久化的汇总记录。

use serde::Serialize;

use crate::models::attempt::{AttemptResult, AttemptStatus};
use crate::models::parse_outcome::Rejection;

/// 一次批次运行使用的调度参数
///
/// 进入汇总记录，便于事后复现运行条件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunParams {
    /// 同时执行的尝试数上限
    pub concurrency_limit: usize,
    /// 单趟尝试的硬超时（毫秒）
    pub attempt_timeout_ms: u64,
    /// 失败后最多追加的重试趟数
    pub max_retries: u32,
    /// 两趟之间的固定等待（毫秒）
    pub retry_delay_ms: u64,
}

/// 批次运行态
#[derive(Debug, Default)]
pub struct BatchState {
    pub total: usize,
    pub completed: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub indeterminate: usize,
    pub failed: usize,
    results: Vec<AttemptResult>,
}

impl BatchState {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            results: Vec::with_capacity(total),
            ..Default::default()
        }
    }

    /// 记录一条终局结果并更新计数
    pub fn record(&mut self, result: AttemptResult) {
        match result.status {
            AttemptStatus::Matched => self.matched += 1,
            AttemptStatus::Mismatched => self.mismatched += 1,
            AttemptStatus::Indeterminate => self.indeterminate += 1,
            AttemptStatus::Failed => self.failed += 1,
        }
        self.completed += 1;
        self.results.push(result);
    }

    pub fn results(&self) -> &[AttemptResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<AttemptResult> {
        self.results
    }
}

/// 持久化的批次汇总
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub batch_id: String,
    /// 汇总生成时间（本地时间）
    pub generated_at: String,
    /// 保留行总数（有效 + 被拒绝）
    pub total_lines: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    /// 本次运行使用的调度参数
    pub params: RunParams,
    pub matched: usize,
    pub mismatched: usize,
    pub indeterminate: usize,
    pub failed: usize,
    /// 被拒绝的输入行（按输入顺序）
    pub rejections: Vec<Rejection>,
    /// 终局结果（已按记录序号升序排列）
    pub results: Vec<AttemptResult>,
}
