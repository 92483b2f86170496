//! 事件基础设施
//!
//! 提供认证事件的发布功能

pub mod channel_event_publisher;
pub mod event_publisher;

pub use channel_event_publisher::*;
pub use event_publisher::*;
