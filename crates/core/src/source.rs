//! Price source identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream API a price snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceSource {
    Coinbase,
    CoinMarketCap,
    Binance,
    CoinGecko,
}

impl PriceSource {
    /// Sources in fallback order, most trusted first.
    pub const FALLBACK_ORDER: [PriceSource; 4] = [
        PriceSource::Coinbase,
        PriceSource::CoinMarketCap,
        PriceSource::Binance,
        PriceSource::CoinGecko,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PriceSource::Coinbase => "Coinbase",
            PriceSource::CoinMarketCap => "CoinMarketCap",
            PriceSource::Binance => "Binance",
            PriceSource::CoinGecko => "CoinGecko",
        }
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
