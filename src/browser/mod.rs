//! 浏览器引导
//!
//! 负责拿到一个可用的 Browser 实例：本地启动无头浏览器，或连接到
//! 已开启调试端口的浏览器。会话页面由基础设施层按需创建。

pub mod connection;
pub mod headless;

pub use connection::connect_to_browser;
pub use headless::launch_headless_browser;
