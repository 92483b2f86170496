//! 仓储接口

mod identity_repository;
mod token_store;

pub use identity_repository::*;
pub use token_store::*;
