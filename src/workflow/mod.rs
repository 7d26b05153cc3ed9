//! 流程层（Workflow Layer）
//!
//! 定义"一条记录"的完整核验流程：
//! - `AttemptCtx` - 上下文封装（批次 + 记录序号 + 产物目录）
//! - `AttemptFlow` - 流程编排（填表 → 提交 → 判定 → 截图）
//! - `AttemptRunner` - 执行端口，调度器只面向它
//!
//! 本层不持有任何资源（Browser / Page），只依赖交互会话端口。

use async_trait::async_trait;

use crate::models::{AttemptOutcome, Record};

pub mod attempt_ctx;
pub mod attempt_flow;

pub use attempt_ctx::AttemptCtx;
pub use attempt_flow::AttemptFlow;

/// 核验执行端口
///
/// 调度器通过该端口驱动单趟核验，不关心交互与判定的细节；
/// 测试用脚本化实现即可独立验证调度行为。
#[async_trait]
pub trait AttemptRunner: Send + Sync {
    /// 执行一趟核验，永远返回产出而不是错误
    async fn attempt(&self, record: &Record, ctx: &AttemptCtx) -> AttemptOutcome;
}
