//! IAM Session Service Library
//!
//! 会话凭证生命周期：
//! - `domain`: Identity 实体、认证事件、仓储与 Token Store 接口
//! - `infrastructure`: PostgreSQL / Redis 身份仓储、Token Store、事件发布、指标
//! - `application`: 认证协调器与身份管理服务
//! - `app`: 从基础设施组装服务

pub mod app;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
