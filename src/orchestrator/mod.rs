//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批次的受理、调度与汇总，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_service` - 批次服务
//! - 管理应用生命周期（初始化、运行）
//! - 允许名单校验与批次级校验
//! - 持有执行端口、存储端口、通知端口
//! - 汇总落盘、归档体积把关、结果外发
//!
//! ### `scheduler` - 有界并发调度器
//! - Semaphore 准入（FIFO，工作保持）
//! - 单趟硬超时与有界重试
//! - 进度上报与单写者批次状态
//!
//! ## 层次关系
//!
//! ```text
//! batch_service (受理一个批次)
//!     ↓
//! scheduler (调度 Vec<Record>)
//!     ↓
//! workflow::AttemptFlow (核验单条 Record)
//!     ↓
//! services (能力层：intake / classifier / aggregator / storage / notifier)
//!     ↓
//! infrastructure (基础设施：会话端口与浏览器适配器)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_service 管受理，scheduler 管调度
//! 2. **资源隔离**：只有编排层持有端口实现
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无业务判定**：只做调度和统计，判定逻辑在流程层之下

pub mod batch_service;
pub mod scheduler;

// 重新导出主要类型
pub use batch_service::{App, BatchReport};
pub use scheduler::run_batch;
