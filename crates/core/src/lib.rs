//! Core data types for the coinwatch bot.

pub mod error;
pub mod price;
pub mod source;
pub mod subscription;
pub mod symbol;

pub use error::*;
pub use price::*;
pub use source::*;
pub use subscription::*;
pub use symbol::*;
