//! 应用层
//!
//! 编排仓储、凭证编解码、Token Store 与事件发布

pub mod auth_coordinator;
pub mod context;
pub mod identity_service;
pub mod pipeline;

pub use auth_coordinator::*;
pub use context::*;
pub use identity_service::*;
pub use pipeline::*;
