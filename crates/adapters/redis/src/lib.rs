//! cuba-adapter-redis - Redis 适配器

mod connection;
mod error;
mod key_value_store;
mod memory;

pub use connection::*;
pub use error::*;
pub use key_value_store::*;
pub use memory::*;
