//! 易失存储上的凭证集合

mod kv_token_store;

pub use kv_token_store::*;
