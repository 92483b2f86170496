//! 服务运行时

use cuba_config::AppConfig;
use cuba_errors::{AppError, AppResult};
use cuba_telemetry::{init_metrics, init_tracing, init_tracing_json};
use tracing::{info, warn};

/// 服务运行时配置
pub struct RuntimeConfig {
    pub config_dir: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            config_dir: "config".to_string(),
        }
    }
}

/// 初始化服务运行时
///
/// 安装 tracing subscriber 与 Prometheus recorder，需在 tokio 运行时内调用。
pub fn init_runtime(config: &AppConfig) -> AppResult<()> {
    if config.is_production() {
        init_tracing_json(&config.telemetry.log_level);
    } else {
        init_tracing(&config.telemetry.log_level);
    }

    init_metrics(config.telemetry.metrics_addr.as_deref())
        .map_err(|e| AppError::internal(e.to_string()))?;

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        metrics_addr = ?config.telemetry.metrics_addr,
        "Runtime initialized"
    );
    Ok(())
}

/// 等待关闭信号
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
