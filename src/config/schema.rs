//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the Luca3Auth service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings (bind address, limits).
    pub server: ServerConfig,

    /// Chain connectivity and transaction settings.
    pub chain: ChainConfig,

    /// Deployed contract addresses.
    pub contracts: ContractsConfig,

    /// Name-resolution directory service.
    pub names: NamesConfig,

    /// Content storage (IPFS pinning) endpoint.
    pub storage: StorageConfig,

    /// Display-only price oracle.
    pub prices: PriceConfig,

    /// Student registration workflow tuning.
    pub registration: RegistrationConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// In-memory session registry limits.
    pub sessions: SessionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds. Long-running workflows are not bound by
    /// this; they run in the background and are polled.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes (image uploads included).
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Chain connectivity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID (84532 for Base Sepolia, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Maximum time to wait for a receipt, in seconds.
    pub receipt_timeout_secs: u64,

    /// Base receipt polling interval in milliseconds.
    pub receipt_poll_ms: u64,

    /// Upper bound for the receipt polling interval in milliseconds.
    pub receipt_poll_max_ms: u64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// Block explorer base URL.
    pub explorer_url: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://sepolia.base.org".to_string(),
            failover_urls: Vec::new(),
            chain_id: 84532,
            rpc_timeout_secs: 10,
            receipt_timeout_secs: 300,
            receipt_poll_ms: 1000,
            receipt_poll_max_ms: 8000,
            max_gas_price_gwei: 500,
            explorer_url: "https://sepolia.basescan.org".to_string(),
        }
    }
}

impl ChainConfig {
    pub fn tx_link(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }

    pub fn address_link(&self, address: &str) -> String {
        format!("{}/address/{}", self.explorer_url.trim_end_matches('/'), address)
    }
}

/// Addresses of the contracts the service talks to.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ContractsConfig {
    /// Luca3Auth registry (students, certifications, admin).
    pub luca3auth: String,

    /// Treasury holding withdrawable USDC.
    pub treasury: String,

    /// USDC token contract.
    pub usdc: String,
}

/// Name service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NamesConfig {
    /// Base URL of the name service API.
    pub base_url: String,

    /// API key sent in the Authorization header. Overridden by
    /// `LUCA3_NAMES_API_KEY`.
    pub api_key: String,

    /// Domain student names are claimed under.
    pub domain: String,

    /// Token suffix that marks an input as a name rather than an address.
    pub suffix: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for NamesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://namestone.xyz/api/public_v1".to_string(),
            api_key: String::new(),
            domain: "luca.eth".to_string(),
            suffix: ".eth".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Content storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Multipart upload endpoint.
    pub upload_url: String,

    /// Bearer token for the upload endpoint. Overridden by
    /// `LUCA3_STORAGE_API_KEY`.
    pub api_key: String,

    /// Upload timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_url: "https://api.pinata.cloud/pinning/pinFileToIPFS".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
        }
    }
}

/// Price oracle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PriceConfig {
    /// Simple-price endpoint.
    pub url: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            url: "https://api.coingecko.com/api/v3/simple/price".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Registration workflow configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Fixed wait, in seconds, granted to the oracle after the registration
    /// request confirms.
    pub oracle_wait_secs: u32,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            oracle_wait_secs: 90,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Session registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions kept before finished ones are evicted.
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_sessions: 1024 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is unset.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
