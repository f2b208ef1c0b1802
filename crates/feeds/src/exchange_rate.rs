//! USD to UZS/RUB fiat exchange rates.
//!
//! UZS comes from the Central Bank of Uzbekistan, RUB from the Central Bank
//! of Russia. Rates are cached for a short time and fall back to the last
//! known value (or a built-in default) when the upstream is unavailable.

use crate::error::FeedError;
use crate::rest::price_value;
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Fiat currencies quoted alongside USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fiat {
    Uzs,
    Rub,
}

impl Fiat {
    /// Rate used until the first successful fetch.
    pub const fn default_rate(self) -> f64 {
        match self {
            Fiat::Uzs => 12_850.0,
            Fiat::Rub => 95.0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Fiat::Uzs => "UZS",
            Fiat::Rub => "RUB",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedRate {
    rate: f64,
    updated: Instant,
}

/// CBU response item: `[{"Ccy": "USD", "Rate": "12850.50"}, ...]`
#[derive(Debug, Deserialize)]
struct CbuRate {
    #[serde(rename = "Ccy")]
    ccy: String,
    #[serde(rename = "Rate")]
    rate: serde_json::Value,
}

/// CBR response: `{"Valute": {"USD": {"Value": 95.1}}}`
#[derive(Debug, Deserialize)]
struct CbrResponse {
    #[serde(rename = "Valute")]
    valute: HashMap<String, CbrValute>,
}

#[derive(Debug, Deserialize)]
struct CbrValute {
    #[serde(rename = "Value")]
    value: f64,
}

/// Cached fiat rate provider.
pub struct FiatRates {
    client: reqwest::Client,
    uzs_url: Option<String>,
    rub_url: Option<String>,
    ttl: Duration,
    cache: DashMap<Fiat, CachedRate>,
}

impl FiatRates {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
    pub const UZS_URL: &'static str = "https://cbu.uz/uz/arkhiv-kursov-valyut/json/";
    pub const RUB_URL: &'static str = "https://www.cbr-xml-daily.ru/daily_json.js";

    pub fn new(client: reqwest::Client, uzs_url: Option<String>, rub_url: Option<String>) -> Self {
        Self {
            client,
            uzs_url: uzs_url.filter(|url| !url.is_empty()),
            rub_url: rub_url.filter(|url| !url.is_empty()),
            ttl: Self::DEFAULT_TTL,
            cache: DashMap::new(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn usd_to_uzs(&self) -> f64 {
        self.usd_to(Fiat::Uzs).await
    }

    pub async fn usd_to_rub(&self) -> f64 {
        self.usd_to(Fiat::Rub).await
    }

    /// Current USD rate for `fiat`. Never fails.
    pub async fn usd_to(&self, fiat: Fiat) -> f64 {
        // Copy out of the map so no guard is held across the fetch.
        let cached = self.cache.get(&fiat).map(|entry| *entry);
        if let Some(cached) = cached {
            if cached.updated.elapsed() < self.ttl {
                return cached.rate;
            }
        }

        let fallback = cached.map_or(fiat.default_rate(), |c| c.rate);

        match self.fetch(fiat).await {
            Ok(rate) => {
                info!(currency = fiat.as_str(), rate = rate, "Fiat rate updated");
                self.cache.insert(
                    fiat,
                    CachedRate {
                        rate,
                        updated: Instant::now(),
                    },
                );
                rate
            }
            Err(e) => {
                warn!(
                    currency = fiat.as_str(),
                    error = %e,
                    fallback = fallback,
                    "Failed to fetch fiat rate, using last known value"
                );
                fallback
            }
        }
    }

    async fn fetch(&self, fiat: Fiat) -> Result<f64, FeedError> {
        let url = match fiat {
            Fiat::Uzs => self.uzs_url.as_deref(),
            Fiat::Rub => self.rub_url.as_deref(),
        }
        .ok_or_else(|| FeedError::NotFound(format!("{} rate url", fiat.as_str())))?;

        debug!(currency = fiat.as_str(), url = url, "Fetching fiat rate");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::from_status(response.status()));
        }
        let body = response.bytes().await?;

        let rate = match fiat {
            Fiat::Uzs => parse_cbu(&body)?,
            Fiat::Rub => parse_cbr(&body)?,
        };

        if rate > 0.0 {
            Ok(rate)
        } else {
            Err(FeedError::ParseError(format!(
                "non-positive {} rate: {}",
                fiat.as_str(),
                rate
            )))
        }
    }
}

fn parse_cbu(body: &[u8]) -> Result<f64, FeedError> {
    let rates: Vec<CbuRate> = serde_json::from_slice(body)?;
    let usd = rates
        .iter()
        .find(|r| r.ccy == "USD")
        .ok_or_else(|| FeedError::NotFound("USD in CBU rates".to_string()))?;
    price_value(&usd.rate)
        .ok_or_else(|| FeedError::ParseError(format!("invalid CBU rate: {}", usd.rate)))
}

fn parse_cbr(body: &[u8]) -> Result<f64, FeedError> {
    let response: CbrResponse = serde_json::from_slice(body)?;
    response
        .valute
        .get("USD")
        .map(|v| v.value)
        .ok_or_else(|| FeedError::NotFound("USD in CBR rates".to_string()))
}
