//! adapter-kafka - Kafka 适配器
//!
//! 提供认证事件投递所需的最小 Kafka 能力：
//! - Topic 幂等声明
//! - 按 key 顺序发布

mod admin;
mod channel;
mod config;

pub use admin::*;
pub use channel::*;
pub use config::*;
