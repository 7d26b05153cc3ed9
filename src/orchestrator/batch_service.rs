//! 批次服务 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批次的受理与资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：启动日志、引导浏览器、装配会话工厂与存储
//! 2. **批次受理**：允许名单校验 → 解析 → 批次级校验
//! 3. **调度执行**：委托有界并发调度器执行全部有效记录
//! 4. **汇总落盘**：恢复输入顺序、写入汇总、打包归档并把关体积
//! 5. **结果外发**：进度、汇总、归档通过通知端口送出
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单条记录的细节
//! - **资源所有者**：唯一持有执行端口、存储端口和通知端口的模块
//! - **向下委托**：调度交给 scheduler，交互交给 workflow

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::{AppError, BatchError};
use crate::infrastructure::BrowserSessionFactory;
use crate::models::{ParseOutcome, Record, Rejection, RunParams};
use crate::orchestrator::scheduler;
use crate::services::aggregator;
use crate::services::intake;
use crate::services::notifier::{LogNotifier, Notifier};
use crate::services::storage::{BatchStore, FsBatchStore};
use crate::utils::logging;
use crate::workflow::{AttemptFlow, AttemptRunner};

/// 批次受理回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub batch_id: String,
    pub valid: usize,
    pub invalid: usize,
}

/// 应用主结构
pub struct App {
    config: Config,
    runner: Arc<dyn AttemptRunner>,
    store: Arc<dyn BatchStore>,
    notifier: Arc<dyn Notifier>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化运行日志文件
        logging::init_log_file(&config.run_log_file)?;

        logging::log_startup(&config);

        // 引导浏览器：调试端口优先，否则本地启动无头浏览器
        let browser = if config.browser_debug_port > 0 {
            browser::connect_to_browser(config.browser_debug_port).await?
        } else {
            browser::launch_headless_browser().await?
        };

        let factory = Arc::new(BrowserSessionFactory::new(
            browser,
            config.target_url.clone(),
        ));
        let runner: Arc<dyn AttemptRunner> = Arc::new(AttemptFlow::new(factory, &config));
        let store: Arc<dyn BatchStore> = Arc::new(FsBatchStore::new(config.output_root.clone()));
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

        Ok(Self {
            config,
            runner,
            store,
            notifier,
        })
    }

    /// 自定义装配（测试或接入其他通知通道时使用）
    pub fn with_parts(
        config: Config,
        runner: Arc<dyn AttemptRunner>,
        store: Arc<dyn BatchStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            runner,
            store,
            notifier,
        }
    }

    /// 运行应用主逻辑
    ///
    /// 从输入文件读取批次文本，作为本地请求者提交。
    pub async fn run(&self) -> Result<()> {
        let text = fs::read_to_string(&self.config.batch_input_file).with_context(|| {
            format!("无法读取批次输入文件: {}", self.config.batch_input_file)
        })?;

        let report = self.submit_batch("local", &text).await?;
        info!(
            "✅ 批次 {} 执行完毕: 有效 {} 条, 拒绝 {} 行",
            report.batch_id, report.valid, report.invalid
        );
        Ok(())
    }

    /// 受理并执行一个批次
    ///
    /// 批次级拒绝（允许名单 / 空批次 / 超量）以错误返回并携带指引；
    /// 单条记录的失败全部在调度器内就地恢复，不会让批次失败。
    pub async fn submit_batch(&self, requester: &str, text: &str) -> Result<BatchReport> {
        // ========== 1. 允许名单（空名单视为全部拒绝）==========
        if !self.config.allowed_requesters.iter().any(|r| r == requester) {
            warn!("⛔ 请求者被拒绝: {}", requester);
            return Err(AppError::Batch(BatchError::RequesterNotAllowed {
                requester: requester.to_string(),
            })
            .into());
        }

        // ========== 2. 解析 ==========
        let outcomes = intake::parse_batch(text);
        let mut records: Vec<Record> = Vec::new();
        let mut rejections: Vec<Rejection> = Vec::new();
        for outcome in outcomes {
            match outcome {
                ParseOutcome::Valid(record) => records.push(record),
                ParseOutcome::Rejected(rejection) => rejections.push(rejection),
            }
        }

        for rejection in &rejections {
            warn!(
                "⚠️ 第 {} 行被拒绝: {} | 原始行: {}",
                rejection.line_no,
                rejection.reason(),
                logging::truncate_text(&rejection.raw_line, 60)
            );
        }

        // ========== 3. 批次级校验（在任何尝试执行之前）==========
        if records.is_empty() {
            return Err(AppError::Batch(BatchError::NoValidRecords {
                invalid: rejections.len(),
            })
            .into());
        }
        if records.len() > self.config.max_records_per_batch {
            return Err(AppError::Batch(BatchError::TooManyRecords {
                count: records.len(),
                max: self.config.max_records_per_batch,
            })
            .into());
        }

        // ========== 4. 批次工作目录 ==========
        let batch_id = format!(
            "batch_{}",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let workspace = self.store.ensure_batch_workspace(&batch_id)?;

        let valid = records.len();
        let invalid = rejections.len();
        logging::log_batch_start(&batch_id, valid, self.config.concurrency_limit);

        // ========== 5. 调度执行 ==========
        let params = RunParams {
            concurrency_limit: self.config.concurrency_limit,
            attempt_timeout_ms: self.config.attempt_timeout_ms,
            max_retries: self.config.max_retries,
            retry_delay_ms: self.config.retry_delay_ms,
        };
        let results = scheduler::run_batch(
            self.runner.clone(),
            records,
            &batch_id,
            &workspace,
            params,
            |done, total| self.notifier.notify_progress(&batch_id, done, total),
        )
        .await;

        // ========== 6. 汇总并落盘 ==========
        let summary = aggregator::aggregate(&batch_id, rejections, results, params);
        self.store.write_summary(&workspace, &summary)?;
        logging::print_final_stats(&summary);
        self.notifier.notify_complete(&batch_id, &summary);

        // ========== 7. 归档（超限只报告，已生成的结果保留）==========
        match self.store.package_archive(&workspace) {
            Ok(archive) => match fs::metadata(&archive) {
                Ok(meta) if meta.len() > self.config.max_archive_bytes => {
                    self.notifier.notify_error(
                        &batch_id,
                        &format!(
                            "归档体积 {} 字节超过上限 {} 字节，不予投递；结果保留在: {}",
                            meta.len(),
                            self.config.max_archive_bytes,
                            workspace.display()
                        ),
                    );
                }
                Ok(_) => self.notifier.notify_artifact(&batch_id, &archive),
                Err(e) => self
                    .notifier
                    .notify_error(&batch_id, &format!("无法读取归档元数据: {}", e)),
            },
            Err(e) => {
                error!("[批次 {}] 归档打包失败: {:#}", batch_id, e);
                self.notifier
                    .notify_error(&batch_id, &format!("归档打包失败: {:#}", e));
            }
        }

        Ok(BatchReport {
            batch_id,
            valid,
            invalid,
        })
    }
}
