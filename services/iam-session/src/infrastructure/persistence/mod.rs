//! 身份仓储的两种后端

mod postgres_identity_repository;
mod redis_identity_repository;

pub use postgres_identity_repository::*;
pub use redis_identity_repository::*;
