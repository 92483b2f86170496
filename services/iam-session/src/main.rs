//! IAM Session Service - 会话服务入口
//!
//! 使用 cuba-bootstrap 统一启动模式

use std::time::Duration;

use cuba_bootstrap::{Infrastructure, RuntimeConfig, init_runtime, spawn_shutdown_listener};
use cuba_config::AppConfig;
use iam_session::app::SessionApp;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let runtime_config = RuntimeConfig::default();
    let config = AppConfig::load(&runtime_config.config_dir)?;
    init_runtime(&config)?;

    let infra = Infrastructure::from_config(config).await?;
    let app = SessionApp::from_infrastructure(&infra);

    let shutdown = spawn_shutdown_listener();
    info!(
        app_name = %infra.config().app_name,
        "IAM session service ready"
    );

    // HTTP 层从 shutdown 派生请求上下文：RequestContext::child_of(&shutdown)
    shutdown.cancelled().await;

    drop(app);
    infra.flush(Duration::from_secs(5));
    info!("IAM session service stopped");
    Ok(())
}
