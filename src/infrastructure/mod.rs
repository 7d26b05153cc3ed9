//! 基础设施层
//!
//! 持有稀缺资源（Browser / Page），只向上暴露能力：
//! - `session` - 交互会话端口与会话守卫
//! - `browser_session` - chromiumoxide 适配器
//! - `js_executor` - 唯一的 page owner，提供 eval() 能力

pub mod browser_session;
pub mod js_executor;
pub mod session;

pub use browser_session::{BrowserSession, BrowserSessionFactory};
pub use js_executor::JsExecutor;
pub use session::{InteractionSession, SessionFactory, SessionGuard};
