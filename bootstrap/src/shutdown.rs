//! Graceful Shutdown

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::shutdown_signal;

/// 创建根取消令牌，收到关闭信号时取消
///
/// 请求级上下文应从该令牌派生子令牌，关闭时进行中的请求一并收到取消。
pub fn spawn_shutdown_listener() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Triggering shutdown");
        trigger.cancel();
    });

    token
}
