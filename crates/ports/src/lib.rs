//! ports - 抽象 trait 层
//!
//! 定义基础设施的抽象接口

mod key_value_store;
mod message_channel;

pub use key_value_store::*;
pub use message_channel::*;
