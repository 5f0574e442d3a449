//! Startup: configuration to a wired orchestrator.
//!
//! Subsystems initialize in dependency order. Any error here is fatal.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::{AlloyLedger, BlockchainClient, BlockchainError, Ledger, Wallet};
use crate::config::loader::{apply_env_overrides, load_config, ConfigError};
use crate::config::validation::validate_config;
use crate::config::AppConfig;
use crate::names::{HttpNameService, IdentityResolver, NameError};
use crate::orchestrator::{ContractAddresses, Orchestrator, OrchestratorError, Services};
use crate::pricing::{CoinGeckoOracle, PriceError, RateCache};
use crate::storage::{HttpContentStore, StorageError};
use crate::treasury::BalanceCache;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("blockchain: {0}")]
    Blockchain(#[from] BlockchainError),

    #[error("name service: {0}")]
    Names(#[from] NameError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("price oracle: {0}")]
    Prices(#[from] PriceError),

    #[error("{0}")]
    Contracts(#[from] OrchestratorError),
}

/// Load and validate the config file, or fall back to defaults.
pub fn load(path: Option<&Path>) -> Result<AppConfig, StartupError> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => {
            let mut config = AppConfig::default();
            apply_env_overrides(&mut config);
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };
    Ok(config)
}

/// Construct every external client and bundle them.
pub async fn build_services(
    config: &AppConfig,
    contracts: &ContractAddresses,
) -> Result<Services, StartupError> {
    let client = BlockchainClient::new(config.chain.clone()).await?;
    let wallet = Wallet::from_env(config.chain.chain_id)?;
    tracing::info!(signer = %wallet.address(), "Signer loaded");

    let ledger: Arc<dyn Ledger> = Arc::new(AlloyLedger::new(client, &wallet, contracts.registry)?);
    let names = Arc::new(HttpNameService::new(&config.names)?);
    let resolver = IdentityResolver::new(names, &config.names.suffix, &config.names.domain);
    let storage = Arc::new(HttpContentStore::new(&config.storage)?);
    let rates = RateCache::new(Arc::new(CoinGeckoOracle::new(&config.prices)?));
    let balances = BalanceCache::new(ledger.clone(), contracts.usdc);

    Ok(Services {
        ledger,
        resolver,
        storage,
        balances,
        rates,
    })
}

pub async fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator, StartupError> {
    let contracts = ContractAddresses::from_config(&config.contracts)?;
    let services = build_services(config, &contracts).await?;
    Ok(Orchestrator::new(services, contracts))
}
