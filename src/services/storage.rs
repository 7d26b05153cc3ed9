//! 批次存储 - 业务能力层
//!
//! 只负责"批次工作目录 / 汇总落盘 / 归档打包"三个能力，
//! 不关心批次如何执行。归档体积上限由调用方把关。

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::BatchSummary;

/// 汇总文件名
const SUMMARY_FILE: &str = "summary.json";

/// 批次存储端口
///
/// 编排层只面向该端口，文件系统实现可在测试中替换。
pub trait BatchStore: Send + Sync {
    /// 确保批次工作目录存在并返回其路径
    fn ensure_batch_workspace(&self, batch_id: &str) -> Result<PathBuf>;

    /// 把汇总写入工作目录，返回汇总文件路径
    fn write_summary(&self, dir: &Path, summary: &BatchSummary) -> Result<PathBuf>;

    /// 把工作目录打包为 zip 归档，返回归档路径
    fn package_archive(&self, dir: &Path) -> Result<PathBuf>;
}

/// 文件系统实现
pub struct FsBatchStore {
    root: PathBuf,
}

impl FsBatchStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BatchStore for FsBatchStore {
    fn ensure_batch_workspace(&self, batch_id: &str) -> Result<PathBuf> {
        let dir = self.root.join(batch_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("无法创建批次工作目录: {}", dir.display()))?;
        debug!("批次工作目录: {}", dir.display());
        Ok(dir)
    }

    fn write_summary(&self, dir: &Path, summary: &BatchSummary) -> Result<PathBuf> {
        let path = dir.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(summary).context("汇总序列化失败")?;
        fs::write(&path, json).with_context(|| format!("无法写入汇总文件: {}", path.display()))?;
        info!("💾 汇总已保存至: {}", path.display());
        Ok(path)
    }

    fn package_archive(&self, dir: &Path) -> Result<PathBuf> {
        let archive_path = dir.with_extension("zip");
        let file = fs::File::create(&archive_path)
            .with_context(|| format!("无法创建归档文件: {}", archive_path.display()))?;

        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        add_dir_entries(&mut writer, dir, dir, options)
            .with_context(|| format!("归档目录失败: {}", dir.display()))?;

        writer.finish().context("归档收尾失败")?;
        info!("📦 归档已生成: {}", archive_path.display());
        Ok(archive_path)
    }
}

/// 递归把目录内容写入归档，条目名使用相对路径
fn add_dir_entries(
    writer: &mut zip::ZipWriter<fs::File>,
    base: &Path,
    dir: &Path,
    options: zip::write::FileOptions,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            add_dir_entries(writer, base, &path, options)?;
            continue;
        }
        let name = path
            .strip_prefix(base)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        writer.start_file(name, options)?;
        writer.write_all(&fs::read(&path)?)?;
    }
    Ok(())
}
