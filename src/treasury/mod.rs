//! Treasury balance cache.
//!
//! Balances are read on demand and cached per address. A confirmed action
//! marks the affected address stale so the next read refetches. When a
//! refetch fails, the last known balance is served and the error logged.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

use crate::blockchain::{BlockchainResult, Ledger};
use crate::orchestrator::units::{eth_as_f64, format_amount, Token};
use crate::pricing::now_secs;

/// Native and stable-coin holdings of one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub native_wei: U256,
    pub stable_units: U256,
    /// Seconds since epoch.
    pub fetched_at: u64,
}

impl BalanceSnapshot {
    pub fn eth(&self) -> String {
        format_amount(self.native_wei, Token::Eth)
    }

    pub fn usdc(&self) -> String {
        format_amount(self.stable_units, Token::Usdc)
    }

    /// Native holdings priced at `eth_usd`, to two decimals.
    pub fn eth_in_usd(&self, eth_usd: f64) -> String {
        format!("{:.2}", eth_as_f64(self.native_wei) * eth_usd)
    }
}

/// Display form of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceView {
    pub address: String,
    pub eth: String,
    pub usdc: String,
    pub eth_usd_value: Option<String>,
    pub fetched_at: u64,
    /// True when the latest refetch failed and this is an older value.
    pub stale: bool,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    snapshot: BalanceSnapshot,
    stale: bool,
}

/// Thread-safe per-address balance cache.
#[derive(Clone)]
pub struct BalanceCache {
    ledger: Arc<dyn Ledger>,
    usdc: Address,
    inner: Arc<DashMap<Address, Entry>>,
}

impl BalanceCache {
    pub fn new(ledger: Arc<dyn Ledger>, usdc: Address) -> Self {
        Self {
            ledger,
            usdc,
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Cached balances for `address`, refetching when absent or stale.
    ///
    /// Returns the snapshot and whether it is a fallback after a failed fetch.
    /// `None` only when nothing was ever fetched successfully.
    pub async fn get(&self, address: Address) -> Option<(BalanceSnapshot, bool)> {
        if let Some(entry) = self.inner.get(&address).map(|e| *e.value()) {
            if !entry.stale {
                return Some((entry.snapshot, false));
            }
        }

        match self.fetch(address).await {
            Ok(snapshot) => {
                self.inner.insert(
                    address,
                    Entry {
                        snapshot,
                        stale: false,
                    },
                );
                Some((snapshot, false))
            }
            Err(e) => {
                tracing::error!(address = %address, error = %e, "Error fetching balances");
                self.inner.get(&address).map(|e| (e.snapshot, true))
            }
        }
    }

    /// Mark `address` for refetch. The old value is kept as a fallback.
    pub fn invalidate(&self, address: Address) {
        if let Some(mut entry) = self.inner.get_mut(&address) {
            entry.stale = true;
            tracing::debug!(address = %address, "Balance invalidated");
        }
    }

    pub fn is_cached(&self, address: &Address) -> bool {
        self.inner.get(address).is_some_and(|e| !e.stale)
    }

    pub async fn view(&self, address: Address, eth_usd: Option<f64>) -> Option<BalanceView> {
        let (snapshot, stale) = self.get(address).await?;
        Some(BalanceView {
            address: address.to_checksum(None),
            eth: snapshot.eth(),
            usdc: snapshot.usdc(),
            eth_usd_value: eth_usd.map(|rate| snapshot.eth_in_usd(rate)),
            fetched_at: snapshot.fetched_at,
            stale,
        })
    }

    async fn fetch(&self, address: Address) -> BlockchainResult<BalanceSnapshot> {
        let (native_wei, stable_units) = tokio::try_join!(
            self.ledger.native_balance(address),
            self.ledger.token_balance(self.usdc, address),
        )?;
        Ok(BalanceSnapshot {
            native_wei,
            stable_units,
            fetched_at: now_secs(),
        })
    }
}
