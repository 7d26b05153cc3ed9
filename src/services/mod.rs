//! 业务能力层
//!
//! 每个模块描述"我能做什么"，只处理单条输入，不关心流程顺序：
//! - `intake` / `dob` - 批次文本解析与规范化
//! - `classifier` - 页面证据判定
//! - `aggregator` - 批次汇总
//! - `storage` - 批次工作目录 / 汇总落盘 / 归档
//! - `notifier` - 进度与结果外发

pub mod aggregator;
pub mod classifier;
pub mod dob;
pub mod intake;
pub mod notifier;
pub mod storage;

pub use classifier::Verdict;
pub use notifier::{LogNotifier, Notifier};
pub use storage::{BatchStore, FsBatchStore};
