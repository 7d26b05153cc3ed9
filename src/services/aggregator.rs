//! 批次汇总 - 业务能力层
//!
//! 纯函数：给定同样的输入必然产出同样的汇总（时间戳除外）。
//! 持久化是存储协作方的事，这里不碰文件系统。

use crate::models::{AttemptResult, AttemptStatus, BatchSummary, Rejection, RunParams};

/// 汇总一次批次运行
///
/// 完成顺序不确定（最快的尝试最先结束），这里按记录序号升序
/// 恢复输入顺序，并统计各状态数量。
pub fn aggregate(
    batch_id: &str,
    rejections: Vec<Rejection>,
    mut results: Vec<AttemptResult>,
    params: RunParams,
) -> BatchSummary {
    results.sort_by_key(|r| r.index);

    let mut matched = 0usize;
    let mut mismatched = 0usize;
    let mut indeterminate = 0usize;
    let mut failed = 0usize;
    for result in &results {
        match result.status {
            AttemptStatus::Matched => matched += 1,
            AttemptStatus::Mismatched => mismatched += 1,
            AttemptStatus::Indeterminate => indeterminate += 1,
            AttemptStatus::Failed => failed += 1,
        }
    }

    BatchSummary {
        batch_id: batch_id.to_string(),
        generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        total_lines: results.len() + rejections.len(),
        valid_records: results.len(),
        invalid_records: rejections.len(),
        params,
        matched,
        mismatched,
        indeterminate,
        failed,
        rejections,
        results,
    }
}
