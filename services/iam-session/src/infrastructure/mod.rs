//! 基础设施层
//!
//! 包含持久化、缓存、事件、可观测性等实现

pub mod cache;
pub mod events;
pub mod observability;
pub mod persistence;
