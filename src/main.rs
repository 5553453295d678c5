use anyhow::Result;
use creator_publish::utils::logging;
use creator_publish::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置（配置文件 + 环境变量）
    let config = Config::load()?;

    // 初始化日志
    logging::init(&config.log_level);

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
