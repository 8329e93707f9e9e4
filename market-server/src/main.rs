use market_server::{Config, Server, ServerState, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // 1. .env (可选) + 配置
    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;

    // 2. 日志
    setup_environment(&config);
    tracing::info!(environment = %config.environment, "Market server starting");

    // 3. 初始化服务器状态 (数据库、网关、通知通道)
    let state = ServerState::initialize(&config).await?;

    // 4. 启动 HTTP 服务器 (Server::run 会启动后台任务)
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "Server error");
        return Err(e.into());
    }

    Ok(())
}
