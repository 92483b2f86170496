//! Redis 连接管理

use cuba_errors::{AppError, AppResult};
use redis::Client;
use redis::aio::ConnectionManager;
use tracing::debug;

use crate::map_redis_error;

/// 创建 Redis 连接管理器
pub async fn create_connection_manager(url: &str) -> AppResult<ConnectionManager> {
    let client = Client::open(url)
        .map_err(|e| AppError::validation(format!("Invalid Redis URL: {}", e)))?;

    let conn = ConnectionManager::new(client)
        .await
        .map_err(|e| map_redis_error("connect", e))?;
    debug!("Redis connection manager created");
    Ok(conn)
}

/// 检查 Redis 连接
pub async fn check_connection(conn: &mut ConnectionManager) -> AppResult<()> {
    redis::cmd("PING")
        .query_async::<String>(conn)
        .await
        .map_err(|e| map_redis_error("ping", e))?;
    Ok(())
}
