//! 交互会话端口 - 基础设施层
//!
//! 核验尝试与页面交互能力之间的唯一边界。所有非确定性和网络延迟
//! 都被关在这个端口后面，测试可以用脚本化实现替换。

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

/// 一次核验尝试独占的页面交互会话
///
/// 会话之间互相看不到对方的表单状态；创建它的尝试是唯一持有者。
#[async_trait]
pub trait InteractionSession: Send + Sync {
    /// 按候选定位器列表填写第一个可见输入框
    ///
    /// 返回 `false` 表示所有候选都没有命中可见、可填写的输入框。
    async fn fill_field(&self, candidates: &[&str], value: &str) -> Result<bool>;

    /// 按候选定位器列表点击第一个可见、可点击的控件
    async fn click_control(&self, candidates: &[&str]) -> Result<bool>;

    /// 当前页面可见文本的一次完整快照
    ///
    /// 判定协议的单次扫描以一份快照为准，保证同一扫描内的优先级原子生效。
    async fn visible_text(&self) -> Result<String>;

    /// 截取当前页面留档，返回实际写入的路径
    async fn capture_artifact(&self, path: &Path) -> Result<PathBuf>;

    /// 关闭会话并释放底层资源
    async fn close(self: Box<Self>) -> Result<()>;
}

/// 会话工厂端口
///
/// 每次调用产出一个全新的隔离会话。
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn InteractionSession>>;
}

/// 会话守卫
///
/// 正常路径显式调用 [`SessionGuard::close`]；尝试被超时中止等非正常
/// 路径下，守卫在析构时把关闭动作转交给一个独立任务异步完成，
/// 保证会话在所有退出路径上都会被释放。
pub struct SessionGuard {
    inner: Option<Box<dyn InteractionSession>>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn InteractionSession>) -> Self {
        Self {
            inner: Some(session),
        }
    }

    pub async fn fill_field(&self, candidates: &[&str], value: &str) -> Result<bool> {
        match &self.inner {
            Some(session) => session.fill_field(candidates, value).await,
            None => anyhow::bail!("会话已关闭"),
        }
    }

    pub async fn click_control(&self, candidates: &[&str]) -> Result<bool> {
        match &self.inner {
            Some(session) => session.click_control(candidates).await,
            None => anyhow::bail!("会话已关闭"),
        }
    }

    pub async fn visible_text(&self) -> Result<String> {
        match &self.inner {
            Some(session) => session.visible_text().await,
            None => anyhow::bail!("会话已关闭"),
        }
    }

    pub async fn capture_artifact(&self, path: &Path) -> Result<PathBuf> {
        match &self.inner {
            Some(session) => session.capture_artifact(path).await,
            None => anyhow::bail!("会话已关闭"),
        }
    }

    /// 显式关闭会话
    pub async fn close(mut self) -> Result<()> {
        match self.inner.take() {
            Some(session) => session.close().await,
            None => Ok(()),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(session) = self.inner.take() {
            // 尝试被中止时仍要释放会话，转交独立任务异步关闭
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = session.close().await;
                });
            }
        }
    }
}
