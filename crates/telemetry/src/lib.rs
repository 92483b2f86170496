//! telemetry - 可观测性库

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid metrics address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("Failed to install Prometheus recorder: {0}")]
    Install(#[from] BuildError),
}

/// 初始化 tracing
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// 初始化 JSON 格式的 tracing（生产环境）
pub fn init_tracing_json(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// 初始化 Prometheus metrics
///
/// 传入监听地址时同时启动 `/metrics` HTTP 导出端（需在 tokio 运行时内调用），
/// 否则只安装 recorder 并返回渲染句柄。
pub fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<PrometheusHandle>, TelemetryError> {
    let builder = PrometheusBuilder::new();

    match metrics_addr {
        Some(addr) => {
            let socket: SocketAddr = addr.parse().map_err(|source| TelemetryError::InvalidAddress {
                addr: addr.to_string(),
                source,
            })?;
            builder.with_http_listener(socket).install()?;
            Ok(None)
        }
        None => Ok(Some(builder.install_recorder()?)),
    }
}
