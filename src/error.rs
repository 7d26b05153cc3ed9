use std::fmt;

/// 应用程序错误类型
///
/// 单条记录的失败在调度器内部就地恢复，永远不会以错误形式出现在这里；
/// 这里只承载浏览器引导、批次受理、存储和配置这几类边界错误。
#[derive(Debug)]
pub enum AppError {
    /// 浏览器引导相关错误
    Browser(BrowserError),
    /// 批次受理错误（携带给请求者的指引）
    Batch(BatchError),
    /// 存储相关错误
    Storage(StorageError),
    /// 配置错误（唯一会让进程启动失败的一类）
    Config(ConfigError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Browser(e) => write!(f, "浏览器错误: {}", e),
            AppError::Batch(e) => write!(f, "批次受理错误: {}", e),
            AppError::Storage(e) => write!(f, "存储错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Browser(e) => Some(e),
            AppError::Batch(e) => Some(e),
            AppError::Storage(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 浏览器引导相关错误
#[derive(Debug)]
pub enum BrowserError {
    /// 本地启动无头浏览器失败
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 连接调试端口失败
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 打开会话页面失败
    SessionOpenFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::LaunchFailed { source } => {
                write!(f, "无法启动无头浏览器: {}", source)
            }
            BrowserError::ConnectionFailed { port, source } => {
                write!(f, "无法连接到浏览器 (端口: {}): {}", port, source)
            }
            BrowserError::SessionOpenFailed { source } => {
                write!(f, "打开会话页面失败: {}", source)
            }
            BrowserError::ScriptExecutionFailed { source } => {
                write!(f, "执行脚本失败: {}", source)
            }
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::LaunchFailed { source }
            | BrowserError::ConnectionFailed { source, .. }
            | BrowserError::SessionOpenFailed { source }
            | BrowserError::ScriptExecutionFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 批次受理错误
///
/// 每个变体的展示文本都是给请求者的完整指引。
#[derive(Debug, PartialEq, Eq)]
pub enum BatchError {
    /// 请求者不在允许名单内
    RequesterNotAllowed { requester: String },
    /// 批次中没有任何有效记录
    NoValidRecords { invalid: usize },
    /// 有效记录数量超过单批上限
    TooManyRecords { count: usize, max: usize },
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::RequesterNotAllowed { requester } => {
                write!(f, "请求者 {} 不在允许名单内，批次未受理", requester)
            }
            BatchError::NoValidRecords { invalid } => {
                write!(
                    f,
                    "批次中没有任何有效记录（{} 行被拒绝），请按\"姓氏,出生日期,邮编,后四位\"格式修正后重新提交",
                    invalid
                )
            }
            BatchError::TooManyRecords { count, max } => {
                write!(
                    f,
                    "批次包含 {} 条有效记录，超过单批上限 {} 条，请拆分后分批提交",
                    count, max
                )
            }
        }
    }
}

impl std::error::Error for BatchError {}

/// 存储相关错误
#[derive(Debug)]
pub enum StorageError {
    /// 创建批次工作目录失败
    WorkspaceCreateFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入汇总失败
    SummaryWriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 归档打包失败
    ArchiveFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::WorkspaceCreateFailed { path, source } => {
                write!(f, "创建批次工作目录失败 ({}): {}", path, source)
            }
            StorageError::SummaryWriteFailed { path, source } => {
                write!(f, "写入汇总失败 ({}): {}", path, source)
            }
            StorageError::ArchiveFailed { path, source } => {
                write!(f, "归档打包失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::WorkspaceCreateFailed { source, .. }
            | StorageError::SummaryWriteFailed { source, .. }
            | StorageError::ArchiveFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件解析失败
    FileParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 配置项取值非法
    InvalidValue { name: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileParseFailed { path, source } => {
                write!(f, "配置文件解析失败 ({}): {}", path, source)
            }
            ConfigError::InvalidValue { name, value } => {
                write!(f, "配置项 {} 取值非法: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::FileParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            ConfigError::InvalidValue { .. } => None,
        }
    }
}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(StorageError::SummaryWriteFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::FileParseFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建工作目录错误
    pub fn workspace_create_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Storage(StorageError::WorkspaceCreateFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建归档错误
    pub fn archive_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Storage(StorageError::ArchiveFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
