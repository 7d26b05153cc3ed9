//! 核验执行流程 - 流程层
//!
//! 核心职责：定义"一条记录"的完整核验流程
//!
//! 流程顺序：
//! 1. 开独立会话 → 填写四个字段 → 提交
//! 2. 轮询页面证据直到得出结论或判定窗口截止
//! 3. 截图留档（失败也截）→ 关闭会话
//!
//! 任何内部错误都被吸收为 `Failed` 产出，绝不向调度器抛出。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::infrastructure::{SessionFactory, SessionGuard};
use crate::models::{AttemptOutcome, AttemptStatus, Record};
use crate::services::classifier::{self, Verdict};
use crate::workflow::attempt_ctx::AttemptCtx;

/// 单个字段的定位策略
///
/// 候选选择器按优先级排列，第一个命中可见输入框的生效。
struct FieldSpec {
    name: &'static str,
    candidates: &'static [&'static str],
}

static LAST_NAME_FIELD: FieldSpec = FieldSpec {
    name: "last_name",
    candidates: &[
        "input[name='lastName']",
        "input[name='last_name']",
        "#lastName",
        "#last-name",
        "input[autocomplete='family-name']",
        "input[placeholder*='last name' i]",
    ],
};

static DOB_FIELD: FieldSpec = FieldSpec {
    name: "dob",
    candidates: &[
        "input[name='dob']",
        "input[name='dateOfBirth']",
        "#dob",
        "#dateOfBirth",
        "input[autocomplete='bday']",
        "input[placeholder*='birth' i]",
    ],
};

static ZIP_FIELD: FieldSpec = FieldSpec {
    name: "zip",
    candidates: &[
        "input[name='zip']",
        "input[name='zipCode']",
        "#zip",
        "#zipCode",
        "input[autocomplete='postal-code']",
        "input[placeholder*='zip' i]",
    ],
};

static LAST4_FIELD: FieldSpec = FieldSpec {
    name: "last4",
    candidates: &[
        "input[name='last4']",
        "input[name='ssnLast4']",
        "#last4",
        "#ssn4",
        "input[placeholder*='last 4' i]",
        "input[placeholder*='ssn' i]",
    ],
};

/// 提交控件候选（第一个可见、可点击的生效；文本兜底在适配器内）
const SUBMIT_CANDIDATES: &[&str] = &[
    "button[type='submit']",
    "input[type='submit']",
    "#submit",
    "button.submit",
    "form button",
];

/// 字段查找的重试间隔
const FIELD_RETRY_INTERVAL: Duration = Duration::from_millis(300);

/// 核验执行流程
///
/// - 编排单条记录的完整核验流程
/// - 不出现 Vec<Record>
/// - 只依赖交互会话端口，不持有 Browser
pub struct AttemptFlow {
    factory: Arc<dyn SessionFactory>,
    field_timeout: Duration,
    classify_timeout: Duration,
    poll_interval: Duration,
    verbose_logging: bool,
}

impl AttemptFlow {
    /// 创建新的核验流程
    pub fn new(factory: Arc<dyn SessionFactory>, config: &Config) -> Self {
        Self {
            factory,
            field_timeout: Duration::from_millis(config.field_timeout_ms),
            classify_timeout: Duration::from_millis(config.classify_timeout_ms),
            poll_interval: Duration::from_millis(config.classify_poll_ms),
            verbose_logging: config.verbose_logging,
        }
    }

    /// 执行一趟核验
    ///
    /// 永远返回产出而不是错误：交互层的任何异常都转化为 `Failed`。
    pub async fn run(&self, record: &Record, ctx: &AttemptCtx) -> AttemptOutcome {
        info!("[记录 {}] 🔐 开始核验: {}", ctx.index, record.last_name);

        let session = match self.factory.open_session().await {
            Ok(session) => session,
            Err(e) => {
                error!("[记录 {}] ❌ 无法打开交互会话: {:#}", ctx.index, e);
                return AttemptOutcome::failed(format!("无法打开交互会话: {:#}", e));
            }
        };
        let guard = SessionGuard::new(session);

        let outcome = match self.drive(&guard, record, ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("[记录 {}] ❌ 核验过程中发生错误: {:#}", ctx.index, e);
                AttemptOutcome::failed(format!("{:#}", e))
            }
        };

        // 无论结论如何都尝试截图留档；截图失败只记日志，不改变结论
        let artifact = self.capture(&guard, ctx, outcome.status).await;

        // 正常路径显式关闭会话（中止路径由守卫兜底）
        if let Err(e) = guard.close().await {
            warn!("[记录 {}] ⚠️ 会话关闭失败: {:#}", ctx.index, e);
        }

        outcome.with_artifact(artifact)
    }

    /// 交互与判定主体
    async fn drive(
        &self,
        session: &SessionGuard,
        record: &Record,
        ctx: &AttemptCtx,
    ) -> Result<AttemptOutcome> {
        // ========== 1. 按固定顺序填写四个字段 ==========
        let fields: [(&FieldSpec, &str); 4] = [
            (&LAST_NAME_FIELD, record.last_name.as_str()),
            (&DOB_FIELD, record.dob.as_str()),
            (&ZIP_FIELD, record.zip.as_str()),
            (&LAST4_FIELD, record.last4.as_str()),
        ];

        let mut filled: Vec<&'static str> = Vec::new();
        for (spec, value) in fields {
            if !self.fill_with_deadline(session, spec, value).await? {
                warn!(
                    "[记录 {}] ⚠️ 未找到可填写的输入框: {}",
                    ctx.index, spec.name
                );
                return Ok(AttemptOutcome::failed(format!(
                    "fields_not_found: 字段 {} 未找到可填写的输入框 (已填写: [{}])",
                    spec.name,
                    filled.join(", ")
                )));
            }
            filled.push(spec.name);
            if self.verbose_logging {
                debug!("[记录 {}] ✓ 已填写 {}", ctx.index, spec.name);
            }
        }
        info!("[记录 {}] ✓ 四个字段填写完成", ctx.index);

        // ========== 2. 提交 ==========
        if !session.click_control(SUBMIT_CANDIDATES).await? {
            warn!("[记录 {}] ⚠️ 找不到可点击的提交控件", ctx.index);
            return Ok(AttemptOutcome::failed(
                "no_submit_control: 找不到可点击的提交控件",
            ));
        }
        info!("[记录 {}] 📤 已提交，等待页面证据...", ctx.index);

        // ========== 3. 轮询判定 ==========
        let status = self.classify(session, ctx).await?;
        info!("[记录 {}] 🏁 判定结论: {}", ctx.index, status);
        Ok(AttemptOutcome::new(status))
    }

    /// 在字段窗口内反复尝试候选定位器
    async fn fill_with_deadline(
        &self,
        session: &SessionGuard,
        spec: &FieldSpec,
        value: &str,
    ) -> Result<bool> {
        let deadline = Instant::now() + self.field_timeout;
        loop {
            if session.fill_field(spec.candidates, value).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(FIELD_RETRY_INTERVAL.min(self.field_timeout)).await;
        }
    }

    /// 判定协议：轮询页面文本直到得出结论或窗口截止
    ///
    /// 每次轮询取一份完整文本快照；同一快照内不匹配证据优先于成功证据，
    /// 跨轮询则先被检出的结论生效。
    async fn classify(&self, session: &SessionGuard, ctx: &AttemptCtx) -> Result<AttemptStatus> {
        let deadline = Instant::now() + self.classify_timeout;
        loop {
            let text = session.visible_text().await?;
            if self.verbose_logging {
                debug!("[记录 {}] 扫描页面文本: {} 字符", ctx.index, text.len());
            }

            match classifier::classify_scan(&text) {
                Some(Verdict::Mismatched) => return Ok(AttemptStatus::Mismatched),
                Some(Verdict::Matched) => return Ok(AttemptStatus::Matched),
                None => {}
            }

            if Instant::now() >= deadline {
                return Ok(AttemptStatus::Indeterminate);
            }
            sleep(self.poll_interval).await;
        }
    }

    /// 截图留档
    ///
    /// 截图失败只记日志，绝不升级为整体失败。
    async fn capture(
        &self,
        session: &SessionGuard,
        ctx: &AttemptCtx,
        status: AttemptStatus,
    ) -> Option<PathBuf> {
        let path = ctx.artifact_path(status.as_str());
        match session.capture_artifact(&path).await {
            Ok(saved) => {
                info!("[记录 {}] 📸 截图已保存: {}", ctx.index, saved.display());
                Some(saved)
            }
            Err(e) => {
                warn!("[记录 {}] ⚠️ 截图失败 (不影响结论): {:#}", ctx.index, e);
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl crate::workflow::AttemptRunner for AttemptFlow {
    async fn attempt(&self, record: &Record, ctx: &AttemptCtx) -> AttemptOutcome {
        self.run(record, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InteractionSession;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// 脚本化会话：行为完全由构造参数决定
    struct ScriptedSession {
        fill_ok: bool,
        click_ok: bool,
        capture_ok: bool,
        texts: Mutex<VecDeque<String>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl InteractionSession for ScriptedSession {
        async fn fill_field(&self, _candidates: &[&str], _value: &str) -> Result<bool> {
            Ok(self.fill_ok)
        }

        async fn click_control(&self, _candidates: &[&str]) -> Result<bool> {
            Ok(self.click_ok)
        }

        async fn visible_text(&self) -> Result<String> {
            let mut texts = self.texts.lock().unwrap();
            // 最后一份文本反复返回，模拟页面停在终态
            if texts.len() > 1 {
                Ok(texts.pop_front().unwrap())
            } else {
                Ok(texts.front().cloned().unwrap_or_default())
            }
        }

        async fn capture_artifact(&self, path: &Path) -> Result<PathBuf> {
            if self.capture_ok {
                Ok(path.to_path_buf())
            } else {
                anyhow::bail!("截图通道不可用")
            }
        }

        async fn close(self: Box<Self>) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct ScriptedFactory {
        fill_ok: bool,
        click_ok: bool,
        capture_ok: bool,
        texts: Vec<String>,
        closed: Arc<AtomicBool>,
    }

    impl ScriptedFactory {
        fn with_texts(texts: &[&str]) -> Self {
            Self {
                fill_ok: true,
                click_ok: true,
                capture_ok: true,
                texts: texts.iter().map(|t| t.to_string()).collect(),
                closed: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl SessionFactory for ScriptedFactory {
        async fn open_session(&self) -> Result<Box<dyn InteractionSession>> {
            Ok(Box::new(ScriptedSession {
                fill_ok: self.fill_ok,
                click_ok: self.click_ok,
                capture_ok: self.capture_ok,
                texts: Mutex::new(self.texts.clone().into()),
                closed: self.closed.clone(),
            }))
        }
    }

    fn test_config() -> Config {
        Config {
            field_timeout_ms: 50,
            classify_timeout_ms: 200,
            classify_poll_ms: 10,
            ..Config::default()
        }
    }

    fn test_record() -> Record {
        Record {
            index: 1,
            last_name: "Martines".to_string(),
            dob: "02/23/1961".to_string(),
            zip: "30331".to_string(),
            last4: "9631".to_string(),
        }
    }

    fn test_ctx(dir: &Path) -> AttemptCtx {
        AttemptCtx::new(1, "batch_test".to_string(), dir.to_path_buf())
    }

    #[tokio::test]
    async fn test_matched_with_artifact_and_session_closed() {
        let dir = tempfile::tempdir().unwrap();
        let factory = ScriptedFactory::with_texts(&[
            "Loading, please wait...",
            "Your identity has been verified.",
        ]);
        let closed = factory.closed.clone();
        let flow = AttemptFlow::new(Arc::new(factory), &test_config());

        let outcome = flow.run(&test_record(), &test_ctx(dir.path())).await;

        assert_eq!(outcome.status, AttemptStatus::Matched);
        assert!(outcome.artifact.is_some());
        assert!(closed.load(Ordering::SeqCst), "会话必须被关闭");
    }

    #[tokio::test]
    async fn test_mismatch_outranks_success_in_same_scan() {
        let dir = tempfile::tempdir().unwrap();
        let factory = ScriptedFactory::with_texts(&[
            "Security code sent. However the information does not match our records.",
        ]);
        let flow = AttemptFlow::new(Arc::new(factory), &test_config());

        let outcome = flow.run(&test_record(), &test_ctx(dir.path())).await;
        assert_eq!(outcome.status, AttemptStatus::Mismatched);
    }

    #[tokio::test]
    async fn test_indeterminate_after_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let factory = ScriptedFactory::with_texts(&["Still processing your request..."]);
        let flow = AttemptFlow::new(Arc::new(factory), &test_config());

        let outcome = flow.run(&test_record(), &test_ctx(dir.path())).await;
        assert_eq!(outcome.status, AttemptStatus::Indeterminate);
    }

    #[tokio::test]
    async fn test_fields_not_found_names_filled_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut factory = ScriptedFactory::with_texts(&[""]);
        factory.fill_ok = false;
        let closed = factory.closed.clone();
        let flow = AttemptFlow::new(Arc::new(factory), &test_config());

        let outcome = flow.run(&test_record(), &test_ctx(dir.path())).await;

        assert_eq!(outcome.status, AttemptStatus::Failed);
        let message = outcome.message.unwrap();
        assert!(message.contains("fields_not_found"), "诊断: {}", message);
        assert!(message.contains("last_name"), "诊断: {}", message);
        assert!(closed.load(Ordering::SeqCst), "失败路径也必须关闭会话");
    }

    #[tokio::test]
    async fn test_no_submit_control() {
        let dir = tempfile::tempdir().unwrap();
        let mut factory = ScriptedFactory::with_texts(&[""]);
        factory.click_ok = false;
        let flow = AttemptFlow::new(Arc::new(factory), &test_config());

        let outcome = flow.run(&test_record(), &test_ctx(dir.path())).await;

        assert_eq!(outcome.status, AttemptStatus::Failed);
        assert!(outcome.message.unwrap().contains("no_submit_control"));
    }

    #[tokio::test]
    async fn test_capture_failure_is_not_escalated() {
        let dir = tempfile::tempdir().unwrap();
        let mut factory = ScriptedFactory::with_texts(&["Your identity has been verified."]);
        factory.capture_ok = false;
        let flow = AttemptFlow::new(Arc::new(factory), &test_config());

        let outcome = flow.run(&test_record(), &test_ctx(dir.path())).await;

        assert_eq!(outcome.status, AttemptStatus::Matched);
        assert!(outcome.artifact.is_none());
    }
}
