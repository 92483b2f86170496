//! 数据库错误映射工具
//!
//! 提供统一的 SQLx 错误到 AppError 的转换

use cuba_errors::AppError;

/// 将 SQLx 错误转换为 AppError，区分不同错误类型
///
/// 传输层故障映射为 `StoreUnavailable`，不会与 `NotFound` 混淆。
pub fn map_sqlx_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::RowNotFound => AppError::not_found("Record not found"),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // PostgreSQL 约束违规代码
            Some("23505") => AppError::conflict(format!(
                "Duplicate entry violates unique constraint {}",
                db_err.constraint().unwrap_or("unknown")
            )),
            Some("23502") => AppError::validation("Not null constraint violation"),
            Some("22001") => AppError::validation("String data too long"),
            Some("22P02") => AppError::validation("Invalid input syntax"),
            Some(code) => AppError::database(format!("Database error ({}): {}", code, db_err)),
            None => AppError::database(db_err.to_string()),
        },
        sqlx::Error::Io(io_err) => {
            AppError::store_unavailable(format!("Database I/O error: {}", io_err))
        }
        sqlx::Error::Tls(tls_err) => {
            AppError::store_unavailable(format!("Database TLS error: {}", tls_err))
        }
        sqlx::Error::PoolTimedOut => {
            AppError::store_unavailable("Database connection pool timeout")
        }
        sqlx::Error::PoolClosed => {
            AppError::store_unavailable("Database connection pool is closed")
        }
        sqlx::Error::WorkerCrashed => {
            AppError::store_unavailable("Database connection worker crashed")
        }
        sqlx::Error::Protocol(msg) => {
            AppError::internal(format!("Database protocol error: {}", msg))
        }
        _ => AppError::database(e.to_string()),
    }
}
