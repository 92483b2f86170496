//! 领域层

pub mod events;
pub mod identity;
pub mod repositories;

pub use events::*;
pub use identity::*;
