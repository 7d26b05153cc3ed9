//! 结果通知 - 业务能力层
//!
//! 进度、汇总和产物的外发通道。真正的聊天通道是外部协作方，
//! 这里定义端口并提供一个只写日志的默认实现。

use std::path::Path;

use tracing::{info, warn};

use crate::models::BatchSummary;

/// 通知端口
pub trait Notifier: Send + Sync {
    /// 批次进度（done / total）
    fn notify_progress(&self, batch_id: &str, done: usize, total: usize);

    /// 批次完成，附带汇总
    fn notify_complete(&self, batch_id: &str, summary: &BatchSummary);

    /// 归档产物可供取回
    fn notify_artifact(&self, batch_id: &str, archive: &Path);

    /// 批次级异常（不中断批次，仅告知）
    fn notify_error(&self, batch_id: &str, message: &str);
}

/// 只写日志的通知实现
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_progress(&self, batch_id: &str, done: usize, total: usize) {
        info!("[批次 {}] 📈 进度: {}/{}", batch_id, done, total);
    }

    fn notify_complete(&self, batch_id: &str, summary: &BatchSummary) {
        info!(
            "[批次 {}] ✅ 完成: 匹配 {}, 不匹配 {}, 无法判定 {}, 失败 {}",
            batch_id, summary.matched, summary.mismatched, summary.indeterminate, summary.failed
        );
    }

    fn notify_artifact(&self, batch_id: &str, archive: &Path) {
        info!("[批次 {}] 📦 归档可取回: {}", batch_id, archive.display());
    }

    fn notify_error(&self, batch_id: &str, message: &str) {
        warn!("[批次 {}] ⚠️ {}", batch_id, message);
    }
}
