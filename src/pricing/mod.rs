//! Display-only price lookups.
//!
//! Rates are never used in on-chain arguments. Fetch failures are logged and
//! the last known rate is served instead.

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::config::PriceConfig;

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("price request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("price response missing {0}")]
    Missing(&'static str),
}

/// Source of the ETH→USD exchange rate.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn eth_usd(&self) -> Result<f64, PriceError>;
}

/// CoinGecko `simple/price` client.
#[derive(Debug, Clone)]
pub struct CoinGeckoOracle {
    client: reqwest::Client,
    url: String,
}

impl CoinGeckoOracle {
    pub fn new(config: &PriceConfig) -> Result<Self, PriceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl PriceOracle for CoinGeckoOracle {
    async fn eth_usd(&self) -> Result<f64, PriceError> {
        let prices: HashMap<String, HashMap<String, f64>> = self
            .client
            .get(&self.url)
            .query(&[("ids", "ethereum"), ("vs_currencies", "usd")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        prices
            .get("ethereum")
            .ok_or(PriceError::Missing("ethereum"))?
            .get("usd")
            .copied()
            .ok_or(PriceError::Missing("ethereum.usd"))
    }
}

/// A rate and when it was observed (seconds since epoch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateSnapshot {
    pub eth_usd: f64,
    pub fetched_at: u64,
}

/// Oracle wrapper that remembers the last good answer.
#[derive(Clone)]
pub struct RateCache {
    oracle: Arc<dyn PriceOracle>,
    last: Arc<ArcSwapOption<RateSnapshot>>,
}

impl RateCache {
    pub fn new(oracle: Arc<dyn PriceOracle>) -> Self {
        Self {
            oracle,
            last: Arc::new(ArcSwapOption::empty()),
        }
    }

    /// Fetch a fresh rate, or fall back to the last known one.
    pub async fn current(&self) -> Option<RateSnapshot> {
        match self.oracle.eth_usd().await {
            Ok(rate) => {
                let snapshot = RateSnapshot {
                    eth_usd: rate,
                    fetched_at: now_secs(),
                };
                self.last.store(Some(Arc::new(snapshot)));
                Some(snapshot)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error fetching ETH to USD rate");
                self.last_known()
            }
        }
    }

    pub fn last_known(&self) -> Option<RateSnapshot> {
        self.last.load_full().map(|s| *s)
    }
}

pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
