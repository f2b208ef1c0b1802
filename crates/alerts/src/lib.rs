//! Telegram side of the coinwatch bot.
//!
//! This crate provides:
//! - SQLite-backed subscription store (users, intervals, watchlists, lookup quota)
//! - Telegram notifier used by the price watch scheduler
//! - Telegram command front-end for lookups and watchlist management

pub mod config;
pub mod db;
pub mod notifier;
pub mod telegram;

pub use config::{LookupQuota, UserProfile};
pub use db::{Database, DbError};
pub use notifier::TelegramNotifier;
pub use telegram::{TelegramBot, TelegramError};
