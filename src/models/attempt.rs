//! 核验尝试结果
//!
//! [`AttemptOutcome`] 是执行器单趟的产出，不含序号和重试记账；
//! [`AttemptResult`] 是调度器为一条记录补全记账后的终局结果，创建后不再修改。

use std::path::PathBuf;

use serde::Serialize;

/// 单条记录的核验状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// 页面出现成功词表证据
    Matched,
    /// 页面出现不匹配词表证据
    Mismatched,
    /// 判定窗口内没有任何证据
    Indeterminate,
    /// 交互失败（含超时、重试耗尽）
    Failed,
}

impl AttemptStatus {
    /// 用于文件命名和日志的英文短标签
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::Matched => "matched",
            AttemptStatus::Mismatched => "mismatched",
            AttemptStatus::Indeterminate => "indeterminate",
            AttemptStatus::Failed => "failed",
        }
    }

    /// 是否为终局结论（不需要重试）
    ///
    /// `Failed` 表示本趟交互失败，由调度器决定是否重试；
    /// 其余三种是判定协议给出的结论，直接终局。
    pub fn is_verdict(self) -> bool {
        !matches!(self, AttemptStatus::Failed)
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AttemptStatus::Matched => "匹配",
            AttemptStatus::Mismatched => "不匹配",
            AttemptStatus::Indeterminate => "无法判定",
            AttemptStatus::Failed => "失败",
        };
        write!(f, "{}", label)
    }
}

/// 执行器单趟产出
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub status: AttemptStatus,
    /// 截图等产物路径（若成功留档）
    pub artifact: Option<PathBuf>,
    /// 诊断信息（失败原因或补充说明）
    pub message: Option<String>,
}

impl AttemptOutcome {
    pub fn new(status: AttemptStatus) -> Self {
        Self {
            status,
            artifact: None,
            message: None,
        }
    }

    /// 构造一个失败产出并附带诊断信息
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: AttemptStatus::Failed,
            artifact: None,
            message: Some(message.into()),
        }
    }

    pub fn with_artifact(mut self, artifact: Option<PathBuf>) -> Self {
        self.artifact = artifact;
        self
    }
}

/// 一条记录的终局结果
///
/// 无论内部经历多少趟重试，每条有效记录都恰好产生一个终局结果。
#[derive(Debug, Clone, Serialize)]
pub struct AttemptResult {
    /// 对应记录的序号（用于恢复输入顺序）
    pub index: usize,
    pub status: AttemptStatus,
    pub artifact: Option<PathBuf>,
    pub message: Option<String>,
    /// 实际执行的趟数（1 + 已消耗的重试数）
    pub passes: u32,
}
