//! Price watch scheduler.
//!
//! This crate decides which subscribers are due for a price check, fetches
//! their watched symbols in one batch, detects meaningful moves against the
//! last price each user saw, and hands formatted messages to a notifier.

pub mod change;
pub mod config;
pub mod due;
pub mod error;
pub mod message;
pub mod ports;
pub mod scheduler;
pub mod state;

pub use change::*;
pub use config::*;
pub use due::*;
pub use error::*;
pub use message::*;
pub use ports::*;
pub use scheduler::*;
pub use state::*;
