//! 浏览器会话适配器 - 基础设施层
//!
//! 用 chromiumoxide 实现交互会话端口。每次核验在独立页面上进行，
//! 并发尝试互相看不到对方的表单状态。
//!
//! 填写 / 点击 / 取文本都通过注入 JS 完成，参数一律经 serde_json
//! 转义后拼入脚本，避免选择器或字段值破坏脚本结构。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Browser;
use tracing::debug;

use crate::infrastructure::js_executor::JsExecutor;
use crate::infrastructure::session::{InteractionSession, SessionFactory};

/// 浏览器会话工厂
///
/// 持有唯一的 Browser 资源；每次 open_session 打开一个新页面并
/// 导航到目标地址。
pub struct BrowserSessionFactory {
    browser: Browser,
    target_url: String,
}

impl BrowserSessionFactory {
    pub fn new(browser: Browser, target_url: impl Into<String>) -> Self {
        Self {
            browser,
            target_url: target_url.into(),
        }
    }
}

#[async_trait]
impl SessionFactory for BrowserSessionFactory {
    async fn open_session(&self) -> Result<Box<dyn InteractionSession>> {
        let page = self
            .browser
            .new_page(self.target_url.as_str())
            .await
            .context("无法打开新页面")?;
        page.wait_for_navigation()
            .await
            .context("页面导航未完成")?;
        debug!("新会话已就绪: {}", self.target_url);

        Ok(Box::new(BrowserSession {
            executor: JsExecutor::new(page),
        }))
    }
}

/// 单次核验独占的浏览器会话
pub struct BrowserSession {
    executor: JsExecutor,
}

#[async_trait]
impl InteractionSession for BrowserSession {
    async fn fill_field(&self, candidates: &[&str], value: &str) -> Result<bool> {
        let script = build_fill_script(candidates, value)?;
        self.executor.eval_bool(script).await
    }

    async fn click_control(&self, candidates: &[&str]) -> Result<bool> {
        let script = build_click_script(candidates)?;
        self.executor.eval_bool(script).await
    }

    async fn visible_text(&self) -> Result<String> {
        self.executor
            .eval_as::<String>("document.body ? document.body.innerText : ''")
            .await
    }

    async fn capture_artifact(&self, path: &Path) -> Result<PathBuf> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.executor
            .page()
            .save_screenshot(params, path)
            .await
            .with_context(|| format!("截图保存失败: {}", path.display()))?;
        Ok(path.to_path_buf())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let page = self.executor.into_page();
        page.close().await.context("关闭页面失败")?;
        Ok(())
    }
}

/// 生成"按候选定位器填写第一个可见输入框"的脚本
fn build_fill_script(candidates: &[&str], value: &str) -> Result<String> {
    let selectors = serde_json::to_string(candidates)?;
    let escaped_value = serde_json::to_string(value)?;

    Ok(format!(
        r#"
        (() => {{
            const candidates = {selectors};
            const value = {escaped_value};
            const visible = (el) =>
                !!(el && el.offsetParent !== null && !el.disabled && !el.readOnly);
            for (const sel of candidates) {{
                let el = null;
                try {{ el = document.querySelector(sel); }} catch (e) {{ continue; }}
                if (!visible(el)) continue;
                el.focus();
                el.value = value;
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                el.blur();
                return true;
            }}
            return false;
        }})()
        "#
    ))
}

/// 生成"按候选定位器点击第一个可见控件"的脚本
///
/// 候选选择器都未命中时，按钮文本兜底扫描一次。
fn build_click_script(candidates: &[&str]) -> Result<String> {
    let selectors = serde_json::to_string(candidates)?;

    Ok(format!(
        r#"
        (() => {{
            const candidates = {selectors};
            const visible = (el) => !!(el && el.offsetParent !== null && !el.disabled);
            for (const sel of candidates) {{
                let el = null;
                try {{ el = document.querySelector(sel); }} catch (e) {{ continue; }}
                if (visible(el)) {{ el.click(); return true; }}
            }}
            const fallbacks = ['submit', 'verify', 'continue', 'next'];
            const controls = document.querySelectorAll(
                'button, input[type="submit"], a[role="button"]');
            for (const el of controls) {{
                if (!visible(el)) continue;
                const text = (el.innerText || el.value || '').trim().toLowerCase();
                if (fallbacks.some((t) => text.includes(t))) {{ el.click(); return true; }}
            }}
            return false;
        }})()
        "#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_script_escapes_value() {
        // 字段值里的引号不能破坏脚本结构
        let script = build_fill_script(&["#lastName"], r#"O'Brien "the" great"#).unwrap();
        assert!(script.contains(r##"["#lastName"]"##));
        assert!(script.contains(r#"O'Brien \"the\" great"#));
    }

    #[test]
    fn test_click_script_embeds_candidates() {
        let script = build_click_script(&["button[type='submit']", "#verify-btn"]).unwrap();
        assert!(script.contains("button[type='submit']"));
        assert!(script.contains("#verify-btn"));
        assert!(script.contains("fallbacks"));
    }
}
