//! Price snapshots returned by the price gateway.

use crate::{PriceSource, Symbol};
use serde::{Deserialize, Serialize};

/// Current price of one coin in every reporting currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub symbol: Symbol,
    /// USD price; this is the reference price used for change detection.
    pub usd: f64,
    /// RUB price, native from the source when available, else converted.
    pub rub: f64,
    /// UZS price, always converted from USD.
    pub uzs: f64,
    /// Source that produced the USD price.
    pub source: PriceSource,
}

impl PriceSnapshot {
    /// Build a snapshot, deriving display currencies from the fiat rates.
    ///
    /// `native_rub` wins over `usd * usd_to_rub` when the source quoted RUB
    /// directly.
    pub fn from_usd(
        symbol: Symbol,
        usd: f64,
        native_rub: Option<f64>,
        usd_to_rub: f64,
        usd_to_uzs: f64,
        source: PriceSource,
    ) -> Self {
        let rub = native_rub
            .filter(|rub| *rub > 0.0)
            .unwrap_or(usd * usd_to_rub);
        Self {
            symbol,
            usd,
            rub: round_to(rub, 4),
            uzs: round_to(usd * usd_to_uzs, 2),
            source,
        }
    }

    /// Single value compared between consecutive observations.
    #[inline]
    pub fn reference_price(&self) -> f64 {
        self.usd
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_usd_converts_missing_rub() {
        let snap = PriceSnapshot::from_usd(
            Symbol::new("BTC"),
            50_000.0,
            None,
            95.0,
            12_850.0,
            PriceSource::Binance,
        );
        assert_eq!(snap.rub, 4_750_000.0);
        assert_eq!(snap.uzs, 642_500_000.0);
        assert_eq!(snap.reference_price(), 50_000.0);
    }

    #[test]
    fn test_from_usd_prefers_native_rub() {
        let snap = PriceSnapshot::from_usd(
            Symbol::new("ETH"),
            3_000.0,
            Some(280_000.12346),
            95.0,
            12_850.0,
            PriceSource::Coinbase,
        );
        assert_eq!(snap.rub, 280_000.1235);
        assert_eq!(snap.source, PriceSource::Coinbase);
    }

    #[test]
    fn test_uzs_rounded_to_cents() {
        let snap = PriceSnapshot::from_usd(
            Symbol::new("SHIB"),
            0.000012345,
            None,
            95.0,
            12_850.0,
            PriceSource::CoinGecko,
        );
        assert_eq!(snap.uzs, 0.16);
    }
}
