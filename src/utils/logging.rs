use anyhow::Result;
/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::BatchSummary;

/// 初始化 tracing 日志
///
/// 级别通过 RUST_LOG 环境变量控制，默认 info。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 初始化运行日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n批量核验运行日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量核验模式");
    info!("📊 最大并发数: {}", config.concurrency_limit);
    info!("⏱ 单趟尝试超时: {} ms", config.attempt_timeout_ms);
    info!(
        "🔁 重试预算: {} 次 (趟间等待 {} ms)",
        config.max_retries, config.retry_delay_ms
    );
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_id`: 批次标识
/// - `total`: 有效记录总数
/// - `max_concurrent`: 最大并发数
pub fn log_batch_start(batch_id: &str, total: usize, max_concurrent: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始执行批次 {}", batch_id);
    info!("📄 有效记录: {} 条, 最多同时 {} 条", total, max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 打印批次最终统计信息
pub fn print_final_stats(summary: &BatchSummary) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批次 {} 处理完成统计", summary.batch_id);
    info!("完成时间: {}", summary.generated_at);
    info!("{}", "=".repeat(60));
    info!("✅ 匹配: {}/{}", summary.matched, summary.valid_records);
    info!("❌ 不匹配: {}", summary.mismatched);
    info!("❓ 无法判定: {}", summary.indeterminate);
    info!("💥 失败: {}", summary.failed);
    info!("🚫 输入被拒绝: {} 行", summary.invalid_records);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
