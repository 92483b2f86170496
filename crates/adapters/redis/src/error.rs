//! Redis 错误映射

use cuba_errors::AppError;
use redis::RedisError;

/// 将 Redis 错误转换为 AppError
///
/// 连接类故障（I/O、拒绝、断开、超时）映射为 `StoreUnavailable`。
pub fn map_redis_error(op: &str, e: RedisError) -> AppError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
    {
        AppError::store_unavailable(format!("Redis {} failed: {}", op, e))
    } else {
        AppError::internal(format!("Redis {} failed: {}", op, e))
    }
}
