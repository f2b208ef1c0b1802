//! Price source gateway for the coinwatch bot.
//!
//! This crate fetches spot prices over REST from several upstream APIs
//! and merges them into `PriceSnapshot`s.
//!
//! ## Architecture
//!
//! - `rest` - One fetcher per upstream API (`SpotPriceFetcher`)
//! - `exchange_rate` - Cached USD to RUB/UZS fiat rates
//! - `gateway` - `PriceGateway` trait and the fallback chain over all fetchers
//! - `symbol_mapping` - Per-source ticker aliases

pub mod error;
pub mod exchange_rate;
pub mod gateway;
pub mod rest;
pub mod symbol_mapping;

pub use error::*;
pub use exchange_rate::*;
pub use gateway::*;
pub use rest::*;
pub use symbol_mapping::*;
