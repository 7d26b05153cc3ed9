use anyhow::Result;
use batch_identity_verify::utils::logging;
use batch_identity_verify::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置（配置错误是致命的）
    let config = Config::load()?;

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
