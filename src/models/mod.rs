//! 数据模型层
//!
//! 只定义批次处理过程中流转的数据类型，不包含任何流程逻辑。

pub mod attempt;
pub mod batch;
pub mod parse_outcome;
pub mod record;

pub use attempt::{AttemptOutcome, AttemptResult, AttemptStatus};
pub use batch::{BatchState, BatchSummary, RunParams};
pub use parse_outcome::{ParseOutcome, RejectKind, Rejection};
pub use record::Record;
