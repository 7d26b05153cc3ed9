use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// 默认配置文件路径（存在则作为默认值的覆盖层）
const CONFIG_FILE: &str = "config.toml";

/// 程序配置
///
/// 取值优先级：环境变量 > config.toml > 内置默认值。
/// 配置错误是唯一会让进程启动失败的一类错误。
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时执行的核验尝试数上限
    pub concurrency_limit: usize,
    /// 单趟尝试的硬超时（毫秒）
    pub attempt_timeout_ms: u64,
    /// 失败后最多追加的重试趟数
    pub max_retries: u32,
    /// 两趟之间的固定等待（毫秒）
    pub retry_delay_ms: u64,
    /// 单批允许的最大有效记录数
    pub max_records_per_batch: usize,
    /// 判定窗口（毫秒）
    pub classify_timeout_ms: u64,
    /// 判定轮询间隔（毫秒）
    pub classify_poll_ms: u64,
    /// 单个字段的查找窗口（毫秒）
    pub field_timeout_ms: u64,
    /// 归档体积上限（字节）
    pub max_archive_bytes: u64,
    /// 批次输出根目录
    pub output_root: String,
    /// 批次输入文件（本地入口）
    pub batch_input_file: String,
    /// 运行日志文件
    pub run_log_file: String,
    /// 核验表单地址
    pub target_url: String,
    /// 浏览器调试端口（0 表示本地启动无头浏览器）
    pub browser_debug_port: u16,
    /// 请求者允许名单（空名单拒绝一切请求）
    pub allowed_requesters: Vec<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency_limit: 4,
            attempt_timeout_ms: 90_000,
            max_retries: 2,
            retry_delay_ms: 3_000,
            max_records_per_batch: 70,
            classify_timeout_ms: 30_000,
            classify_poll_ms: 250,
            field_timeout_ms: 5_000,
            max_archive_bytes: 49 * 1024 * 1024,
            output_root: "output".to_string(),
            batch_input_file: "input/batch.txt".to_string(),
            run_log_file: "run.log".to_string(),
            target_url: "https://verify.example.com/identity".to_string(),
            browser_debug_port: 0,
            allowed_requesters: vec!["local".to_string()],
            verbose_logging: false,
        }
    }
}

/// config.toml 的部分覆盖层（字段全部可省略）
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    concurrency_limit: Option<usize>,
    attempt_timeout_ms: Option<u64>,
    max_retries: Option<u32>,
    retry_delay_ms: Option<u64>,
    max_records_per_batch: Option<usize>,
    classify_timeout_ms: Option<u64>,
    classify_poll_ms: Option<u64>,
    field_timeout_ms: Option<u64>,
    max_archive_bytes: Option<u64>,
    output_root: Option<String>,
    batch_input_file: Option<String>,
    run_log_file: Option<String>,
    target_url: Option<String>,
    browser_debug_port: Option<u16>,
    allowed_requesters: Option<Vec<String>>,
    verbose_logging: Option<bool>,
}

impl Config {
    /// 加载配置：内置默认值 → config.toml（若存在）→ 环境变量
    pub fn load() -> Result<Self> {
        let base = match fs::read_to_string(CONFIG_FILE) {
            Ok(content) => Self::from_toml(&content)
                .with_context(|| format!("配置文件解析失败: {}", CONFIG_FILE))?,
            Err(_) => Self::default(),
        };
        Ok(base.overlay_env())
    }

    /// 仅用环境变量覆盖内置默认值
    pub fn from_env() -> Self {
        Self::default().overlay_env()
    }

    /// 从 TOML 文本构造（缺省字段取内置默认值）
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.merge_into(Self::default()))
    }

    /// 从指定路径加载 TOML 配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// 用环境变量覆盖当前取值
    fn overlay_env(self) -> Self {
        Self {
            concurrency_limit: env_parse("CONCURRENCY_LIMIT", self.concurrency_limit),
            attempt_timeout_ms: env_parse("ATTEMPT_TIMEOUT_MS", self.attempt_timeout_ms),
            max_retries: env_parse("MAX_RETRIES", self.max_retries),
            retry_delay_ms: env_parse("RETRY_DELAY_MS", self.retry_delay_ms),
            max_records_per_batch: env_parse("MAX_RECORDS_PER_BATCH", self.max_records_per_batch),
            classify_timeout_ms: env_parse("CLASSIFY_TIMEOUT_MS", self.classify_timeout_ms),
            classify_poll_ms: env_parse("CLASSIFY_POLL_MS", self.classify_poll_ms),
            field_timeout_ms: env_parse("FIELD_TIMEOUT_MS", self.field_timeout_ms),
            max_archive_bytes: env_parse("MAX_ARCHIVE_BYTES", self.max_archive_bytes),
            output_root: std::env::var("OUTPUT_ROOT").unwrap_or(self.output_root),
            batch_input_file: std::env::var("BATCH_INPUT_FILE").unwrap_or(self.batch_input_file),
            run_log_file: std::env::var("RUN_LOG_FILE").unwrap_or(self.run_log_file),
            target_url: std::env::var("TARGET_URL").unwrap_or(self.target_url),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT", self.browser_debug_port),
            allowed_requesters: std::env::var("ALLOWED_REQUESTERS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or(self.allowed_requesters),
            verbose_logging: env_parse("VERBOSE_LOGGING", self.verbose_logging),
        }
    }
}

impl ConfigFile {
    fn merge_into(self, base: Config) -> Config {
        Config {
            concurrency_limit: self.concurrency_limit.unwrap_or(base.concurrency_limit),
            attempt_timeout_ms: self.attempt_timeout_ms.unwrap_or(base.attempt_timeout_ms),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            retry_delay_ms: self.retry_delay_ms.unwrap_or(base.retry_delay_ms),
            max_records_per_batch: self
                .max_records_per_batch
                .unwrap_or(base.max_records_per_batch),
            classify_timeout_ms: self.classify_timeout_ms.unwrap_or(base.classify_timeout_ms),
            classify_poll_ms: self.classify_poll_ms.unwrap_or(base.classify_poll_ms),
            field_timeout_ms: self.field_timeout_ms.unwrap_or(base.field_timeout_ms),
            max_archive_bytes: self.max_archive_bytes.unwrap_or(base.max_archive_bytes),
            output_root: self.output_root.unwrap_or(base.output_root),
            batch_input_file: self.batch_input_file.unwrap_or(base.batch_input_file),
            run_log_file: self.run_log_file.unwrap_or(base.run_log_file),
            target_url: self.target_url.unwrap_or(base.target_url),
            browser_debug_port: self.browser_debug_port.unwrap_or(base.browser_debug_port),
            allowed_requesters: self.allowed_requesters.unwrap_or(base.allowed_requesters),
            verbose_logging: self.verbose_logging.unwrap_or(base.verbose_logging),
        }
    }
}

/// 解析环境变量，解析失败时退回默认值
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
