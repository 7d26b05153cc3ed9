//! 核验上下文
//!
//! 封装"我正在处理哪个批次的第几条记录"这一信息

use std::fmt::Display;
use std::path::PathBuf;

/// 核验上下文
///
/// 包含执行单条记录核验所需的所有上下文信息
#[derive(Debug, Clone)]
pub struct AttemptCtx {
    /// 记录序号（从 1 开始，用于日志和产物命名）
    pub index: usize,

    /// 所属批次标识
    pub batch_id: String,

    /// 截图等产物的存放目录
    pub artifact_dir: PathBuf,
}

impl AttemptCtx {
    /// 创建新的核验上下文
    pub fn new(index: usize, batch_id: String, artifact_dir: PathBuf) -> Self {
        Self {
            index,
            batch_id,
            artifact_dir,
        }
    }

    /// 产物文件路径（按记录序号和状态命名）
    pub fn artifact_path(&self, status_label: &str) -> PathBuf {
        self.artifact_dir
            .join(format!("{:03}_{}.png", self.index, status_label))
    }
}

impl Display for AttemptCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[批次 {} 记录 #{}]", self.batch_id, self.index)
    }
}
