//! REST API spot price fetchers.
//!
//! One fetcher per upstream API. Each one answers a single question:
//! "what is the USD price of this ticker right now?" The fallback order
//! across fetchers lives in `gateway`.

use crate::error::FeedError;
use crate::symbol_mapping::{coingecko_id, coinmarketcap_symbol};
use async_trait::async_trait;
use coinwatch_core::{PriceSource, Symbol};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Spot price as quoted by one source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotQuote {
    pub usd: f64,
    /// RUB price when the source quotes it natively.
    pub rub: Option<f64>,
}

impl SpotQuote {
    pub fn usd(usd: f64) -> Self {
        Self { usd, rub: None }
    }
}

/// A single upstream price API.
#[async_trait]
pub trait SpotPriceFetcher: Send + Sync {
    /// Provenance tag for prices from this fetcher.
    fn source(&self) -> PriceSource;

    /// Fetch the current USD price. Non-positive prices are `NotFound`.
    async fn fetch_spot(&self, symbol: &Symbol) -> Result<SpotQuote, FeedError>;
}

/// Build an HTTP client with a per-request timeout.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, FeedError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent("coinwatch/0.1")
        .build()?)
}

async fn get_json(request: reqwest::RequestBuilder) -> Result<Value, FeedError> {
    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(FeedError::from_status(response.status()));
    }
    Ok(response.json::<Value>().await?)
}

/// Read a price that may be encoded either as a JSON number or a string.
pub(crate) fn price_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn positive_price(value: &Value, symbol: &Symbol) -> Result<f64, FeedError> {
    match price_value(value) {
        Some(price) if price > 0.0 => Ok(price),
        Some(_) => Err(FeedError::NotFound(symbol.to_string())),
        None if value.is_null() => Err(FeedError::NotFound(symbol.to_string())),
        None => Err(FeedError::ParseError(format!(
            "unexpected price value for {}: {}",
            symbol, value
        ))),
    }
}

/// Coinbase spot price API.
pub struct CoinbaseRestFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl CoinbaseRestFetcher {
    pub const BASE_URL: &'static str = "https://api.coinbase.com/v2/prices";

    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_pair(&self, symbol: &Symbol, fiat: &str) -> Result<f64, FeedError> {
        let url = format!("{}/{}-{}/spot", self.base_url, symbol, fiat);
        let json = get_json(self.client.get(&url)).await?;
        // Response: {"data": {"base": "BTC", "currency": "USD", "amount": "50000.00"}}
        positive_price(&json["data"]["amount"], symbol)
    }
}

#[async_trait]
impl SpotPriceFetcher for CoinbaseRestFetcher {
    fn source(&self) -> PriceSource {
        PriceSource::Coinbase
    }

    async fn fetch_spot(&self, symbol: &Symbol) -> Result<SpotQuote, FeedError> {
        let usd = self.fetch_pair(symbol, "USD").await?;

        let rub = match self.fetch_pair(symbol, "RUB").await {
            Ok(rub) => Some(rub),
            Err(e) => {
                debug!(symbol = %symbol, error = %e, "Coinbase: no native RUB price");
                None
            }
        };

        Ok(SpotQuote { usd, rub })
    }
}

/// CoinMarketCap quotes API. Requires an API key.
pub struct CoinMarketCapRestFetcher {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl CoinMarketCapRestFetcher {
    pub const URL: &'static str =
        "https://pro-api.coinmarketcap.com/v2/cryptocurrency/quotes/latest";

    pub fn new(client: reqwest::Client, url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key: api_key.filter(|key| !key.is_empty()),
        }
    }

    async fn fetch_listing(
        &self,
        api_key: &str,
        listing: &str,
        symbol: &Symbol,
    ) -> Result<f64, FeedError> {
        let request = self
            .client
            .get(&self.url)
            .header("Accepts", "application/json")
            .header("X-CMC_PRO_API_KEY", api_key)
            .query(&[("symbol", listing), ("convert", "USD")]);
        let json = get_json(request).await?;

        // Response: {"data": {"BTC": [{"quote": {"USD": {"price": 50000.0}}}]}}
        let first = json["data"][listing]
            .as_array()
            .and_then(|entries| entries.first())
            .ok_or_else(|| FeedError::NotFound(symbol.to_string()))?;
        positive_price(&first["quote"]["USD"]["price"], symbol)
    }
}

#[async_trait]
impl SpotPriceFetcher for CoinMarketCapRestFetcher {
    fn source(&self) -> PriceSource {
        PriceSource::CoinMarketCap
    }

    async fn fetch_spot(&self, symbol: &Symbol) -> Result<SpotQuote, FeedError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(FeedError::MissingApiKey("CoinMarketCap"))?;

        let listing = coinmarketcap_symbol(symbol);
        match self.fetch_listing(api_key, listing, symbol).await {
            Ok(usd) => Ok(SpotQuote::usd(usd)),
            Err(FeedError::NotFound(_)) | Err(FeedError::HttpStatus(_))
                if listing != symbol.as_str() =>
            {
                debug!(
                    symbol = %symbol,
                    listing = listing,
                    "CoinMarketCap: alias not listed, retrying with raw symbol"
                );
                let usd = self.fetch_listing(api_key, symbol.as_str(), symbol).await?;
                Ok(SpotQuote::usd(usd))
            }
            Err(e) => Err(e),
        }
    }
}

/// Binance spot ticker API (USDT pairs).
pub struct BinanceRestFetcher {
    client: reqwest::Client,
    url: String,
}

impl BinanceRestFetcher {
    pub const URL: &'static str = "https://api.binance.com/api/v3/ticker/price";

    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SpotPriceFetcher for BinanceRestFetcher {
    fn source(&self) -> PriceSource {
        PriceSource::Binance
    }

    async fn fetch_spot(&self, symbol: &Symbol) -> Result<SpotQuote, FeedError> {
        let pair = format!("{}USDT", symbol);
        let json = get_json(self.client.get(&self.url).query(&[("symbol", pair.as_str())])).await?;
        // Response: {"symbol": "BTCUSDT", "price": "50000.00000000"}
        let usd = positive_price(&json["price"], symbol)?;
        Ok(SpotQuote::usd(usd))
    }
}

/// CoinGecko simple price API.
pub struct CoinGeckoRestFetcher {
    client: reqwest::Client,
    url: String,
}

impl CoinGeckoRestFetcher {
    pub const URL: &'static str = "https://api.coingecko.com/api/v3/simple/price";

    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SpotPriceFetcher for CoinGeckoRestFetcher {
    fn source(&self) -> PriceSource {
        PriceSource::CoinGecko
    }

    async fn fetch_spot(&self, symbol: &Symbol) -> Result<SpotQuote, FeedError> {
        let id = coingecko_id(symbol);
        let request = self.client.get(&self.url).query(&[
            ("ids", id.as_str()),
            ("vs_currencies", "usd"),
            ("include_24hr_change", "false"),
        ]);
        let json = get_json(request).await?;
        // Response: {"bitcoin": {"usd": 50000.0}}
        let usd = positive_price(&json[id.as_str()]["usd"], symbol)?;
        Ok(SpotQuote::usd(usd))
    }
}
