//! Price gateway: one call, many symbols, every source in fallback order.

use crate::error::FeedError;
use crate::exchange_rate::FiatRates;
use crate::rest::{
    http_client, BinanceRestFetcher, CoinGeckoRestFetcher, CoinMarketCapRestFetcher,
    CoinbaseRestFetcher, SpotPriceFetcher,
};
use async_trait::async_trait;
use coinwatch_core::{PriceSnapshot, Symbol};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fetches current prices for a batch of symbols.
#[async_trait]
pub trait PriceGateway: Send + Sync {
    /// Returns one entry per input symbol, in input order. `None` means no
    /// source had a price for that symbol. `Err` means the call as a whole
    /// failed and no result should be trusted.
    async fn fetch_prices(
        &self,
        symbols: &[Symbol],
    ) -> Result<Vec<Option<PriceSnapshot>>, FeedError>;
}

/// Upstream endpoints. Defaults point at the public production APIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceEndpoints {
    pub coinbase_url: String,
    pub coinmarketcap_url: String,
    pub coinmarketcap_api_key: Option<String>,
    pub binance_url: String,
    pub coingecko_url: String,
    pub uzs_rate_url: Option<String>,
    pub rub_rate_url: Option<String>,
    /// Per-request HTTP timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Deadline for one symbol across the whole fallback chain. A symbol
    /// that misses it comes back as `None`.
    pub symbol_timeout_ms: u64,
    /// Upper bound for a whole `fetch_prices` call in milliseconds.
    pub call_timeout_ms: u64,
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        Self {
            coinbase_url: CoinbaseRestFetcher::BASE_URL.to_string(),
            coinmarketcap_url: CoinMarketCapRestFetcher::URL.to_string(),
            coinmarketcap_api_key: None,
            binance_url: BinanceRestFetcher::URL.to_string(),
            coingecko_url: CoinGeckoRestFetcher::URL.to_string(),
            uzs_rate_url: Some(FiatRates::UZS_URL.to_string()),
            rub_rate_url: Some(FiatRates::RUB_URL.to_string()),
            request_timeout_ms: 10_000,
            symbol_timeout_ms: 25_000,
            call_timeout_ms: 60_000,
        }
    }
}

/// Gateway that asks each fetcher in turn until one has a positive price.
pub struct FallbackGateway {
    fetchers: Vec<Arc<dyn SpotPriceFetcher>>,
    rates: Arc<FiatRates>,
    symbol_timeout: Duration,
    call_timeout: Duration,
}

impl FallbackGateway {
    pub fn new(
        fetchers: Vec<Arc<dyn SpotPriceFetcher>>,
        rates: Arc<FiatRates>,
        symbol_timeout: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            fetchers,
            rates,
            symbol_timeout,
            call_timeout,
        }
    }

    /// Coinbase, CoinMarketCap, Binance, CoinGecko, in that order.
    pub fn from_endpoints(endpoints: &SourceEndpoints) -> Result<Self, FeedError> {
        let client = http_client(Duration::from_millis(endpoints.request_timeout_ms))?;

        let fetchers: Vec<Arc<dyn SpotPriceFetcher>> = vec![
            Arc::new(CoinbaseRestFetcher::new(
                client.clone(),
                endpoints.coinbase_url.clone(),
            )),
            Arc::new(CoinMarketCapRestFetcher::new(
                client.clone(),
                endpoints.coinmarketcap_url.clone(),
                endpoints.coinmarketcap_api_key.clone(),
            )),
            Arc::new(BinanceRestFetcher::new(
                client.clone(),
                endpoints.binance_url.clone(),
            )),
            Arc::new(CoinGeckoRestFetcher::new(
                client.clone(),
                endpoints.coingecko_url.clone(),
            )),
        ];

        let rates = FiatRates::new(
            client,
            endpoints.uzs_rate_url.clone(),
            endpoints.rub_rate_url.clone(),
        );

        Ok(Self::new(
            fetchers,
            Arc::new(rates),
            Duration::from_millis(endpoints.symbol_timeout_ms),
            Duration::from_millis(endpoints.call_timeout_ms),
        ))
    }

    async fn fetch_one(
        &self,
        symbol: &Symbol,
        usd_to_rub: f64,
        usd_to_uzs: f64,
    ) -> Option<PriceSnapshot> {
        for fetcher in &self.fetchers {
            let source = fetcher.source();
            match fetcher.fetch_spot(symbol).await {
                Ok(quote) if quote.usd > 0.0 => {
                    debug!(symbol = %symbol, source = %source, usd = quote.usd, "Price found");
                    return Some(PriceSnapshot::from_usd(
                        symbol.clone(),
                        quote.usd,
                        quote.rub,
                        usd_to_rub,
                        usd_to_uzs,
                        source,
                    ));
                }
                Ok(quote) => {
                    debug!(symbol = %symbol, source = %source, usd = quote.usd, "Ignoring non-positive price");
                }
                Err(e) if e.is_transient() => {
                    warn!(symbol = %symbol, source = %source, error = %e, "Source unavailable, trying next");
                }
                Err(e) => {
                    debug!(symbol = %symbol, source = %source, error = %e, "No price from source");
                }
            }
        }

        warn!(symbol = %symbol, "No source has a price");
        None
    }

    async fn fetch_all(&self, symbols: &[Symbol]) -> Vec<Option<PriceSnapshot>> {
        let usd_to_uzs = self.rates.usd_to_uzs().await;
        let usd_to_rub = self.rates.usd_to_rub().await;
        debug!(usd_to_uzs, usd_to_rub, "Fiat rates");

        let futures = symbols.iter().map(|symbol| async move {
            let fetch = self.fetch_one(symbol, usd_to_rub, usd_to_uzs);
            match tokio::time::timeout(self.symbol_timeout, fetch).await {
                Ok(snapshot) => snapshot,
                Err(_) => {
                    warn!(symbol = %symbol, timeout = ?self.symbol_timeout, "Symbol fetch timed out");
                    None
                }
            }
        });
        join_all(futures).await
    }
}

#[async_trait]
impl PriceGateway for FallbackGateway {
    async fn fetch_prices(
        &self,
        symbols: &[Symbol],
    ) -> Result<Vec<Option<PriceSnapshot>>, FeedError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let results = tokio::time::timeout(self.call_timeout, self.fetch_all(symbols))
            .await
            .map_err(|_| {
                FeedError::Timeout(format!(
                    "price fetch for {} symbols exceeded {:?}",
                    symbols.len(),
                    self.call_timeout
                ))
            })?;

        let found = results.iter().filter(|r| r.is_some()).count();
        info!(requested = symbols.len(), found, "Prices fetched");

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::SpotQuote;
    use coinwatch_core::PriceSource;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedFetcher {
        source: PriceSource,
        prices: HashMap<&'static str, f64>,
        stalls: HashMap<&'static str, Duration>,
        calls: AtomicUsize,
    }

    impl FixedFetcher {
        fn new(source: PriceSource, prices: &[(&'static str, f64)]) -> Arc<Self> {
            Self::stalling(source, prices, &[])
        }

        /// Like `new`, but each symbol in `stalls` sleeps before answering.
        fn stalling(
            source: PriceSource,
            prices: &[(&'static str, f64)],
            stalls: &[(&'static str, Duration)],
        ) -> Arc<Self> {
            Arc::new(Self {
                source,
                prices: prices.iter().copied().collect(),
                stalls: stalls.iter().copied().collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SpotPriceFetcher for FixedFetcher {
        fn source(&self) -> PriceSource {
            self.source
        }

        async fn fetch_spot(&self, symbol: &Symbol) -> Result<SpotQuote, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.stalls.get(symbol.as_str()) {
                tokio::time::sleep(*delay).await;
            }
            match self.prices.get(symbol.as_str()) {
                Some(price) => Ok(SpotQuote::usd(*price)),
                None => Err(FeedError::NotFound(symbol.to_string())),
            }
        }
    }

    fn offline_rates() -> Arc<FiatRates> {
        Arc::new(FiatRates::new(
            http_client(Duration::from_secs(1)).unwrap(),
            None,
            None,
        ))
    }

    fn gateway(fetchers: Vec<Arc<FixedFetcher>>) -> FallbackGateway {
        let fetchers = fetchers
            .into_iter()
            .map(|f| f as Arc<dyn SpotPriceFetcher>)
            .collect();
        FallbackGateway::new(
            fetchers,
            offline_rates(),
            Duration::from_secs(5),
            Duration::from_secs(10),
        )
    }

    fn symbols(list: &[&str]) -> Vec<Symbol> {
        list.iter().map(|s| Symbol::new(s)).collect()
    }

    #[tokio::test]
    async fn test_first_source_wins() {
        let coinbase = FixedFetcher::new(PriceSource::Coinbase, &[("BTC", 50_000.0)]);
        let binance = FixedFetcher::new(PriceSource::Binance, &[("BTC", 49_999.0)]);
        let gw = gateway(vec![coinbase, binance.clone()]);

        let result = gw.fetch_prices(&symbols(&["BTC"])).await.unwrap();
        let snap = result[0].as_ref().unwrap();

        assert_eq!(snap.usd, 50_000.0);
        assert_eq!(snap.source, PriceSource::Coinbase);
        assert_eq!(snap.rub, 50_000.0 * 95.0);
        assert_eq!(binance.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_back_and_preserves_order() {
        let coinbase = FixedFetcher::new(PriceSource::Coinbase, &[("BTC", 50_000.0)]);
        let gecko = FixedFetcher::new(PriceSource::CoinGecko, &[("NOT", 0.006), ("BTC", 1.0)]);
        let gw = gateway(vec![coinbase, gecko]);

        let result = gw
            .fetch_prices(&symbols(&["NOT", "ZZZ", "BTC"]))
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].as_ref().unwrap().source, PriceSource::CoinGecko);
        assert_eq!(result[0].as_ref().unwrap().usd, 0.006);
        assert!(result[1].is_none());
        assert_eq!(result[2].as_ref().unwrap().source, PriceSource::Coinbase);
    }

    #[tokio::test]
    async fn test_zero_price_is_skipped() {
        let coinbase = FixedFetcher::new(PriceSource::Coinbase, &[("ETH", 0.0)]);
        let binance = FixedFetcher::new(PriceSource::Binance, &[("ETH", 3_000.0)]);
        let gw = gateway(vec![coinbase, binance]);

        let result = gw.fetch_prices(&symbols(&["ETH"])).await.unwrap();
        assert_eq!(result[0].as_ref().unwrap().source, PriceSource::Binance);
    }

    #[tokio::test]
    async fn test_empty_request() {
        let gw = gateway(vec![]);
        assert_eq!(gw.fetch_prices(&[]).await.unwrap(), Vec::new());
    }

    #[tokio::test]
    async fn test_slow_symbol_does_not_block_others() {
        let coinbase = FixedFetcher::stalling(
            PriceSource::Coinbase,
            &[("BTC", 50_000.0), ("SLOW", 1.0)],
            &[("SLOW", Duration::from_secs(5))],
        );
        let gw = FallbackGateway::new(
            vec![coinbase as Arc<dyn SpotPriceFetcher>],
            offline_rates(),
            Duration::from_millis(100),
            Duration::from_secs(10),
        );

        let result = gw.fetch_prices(&symbols(&["BTC", "SLOW"])).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].as_ref().unwrap().usd, 50_000.0);
        assert!(result[1].is_none());
    }

    #[tokio::test]
    async fn test_call_timeout() {
        let slow = FixedFetcher::stalling(
            PriceSource::Coinbase,
            &[("BTC", 50_000.0)],
            &[("BTC", Duration::from_secs(5))],
        );
        let gw = FallbackGateway::new(
            vec![slow as Arc<dyn SpotPriceFetcher>],
            offline_rates(),
            Duration::from_secs(10),
            Duration::from_millis(50),
        );

        let result = gw.fetch_prices(&symbols(&["BTC"])).await;
        assert!(matches!(result, Err(FeedError::Timeout(_))));
    }

    #[test]
    fn test_standard_chain_order() {
        let gw = FallbackGateway::from_endpoints(&SourceEndpoints::default()).unwrap();
        let order: Vec<PriceSource> = gw.fetchers.iter().map(|f| f.source()).collect();
        assert_eq!(order, PriceSource::FALLBACK_ORDER.to_vec());
    }

    #[test]
    fn test_endpoints_deserialize_with_defaults() {
        let endpoints: SourceEndpoints =
            serde_json::from_str(r#"{"binance_url": "http://localhost:9000"}"#).unwrap();
        assert_eq!(endpoints.binance_url, "http://localhost:9000");
        assert_eq!(endpoints.coinbase_url, CoinbaseRestFetcher::BASE_URL);
        assert_eq!(endpoints.coinmarketcap_api_key, None);
    }
}
