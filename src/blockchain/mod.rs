//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key) + ChainConfig
//!     → wallet.rs (key loading)
//!     → client.rs (read-only RPC with failover and timeouts)
//!     → contracts.rs (call descriptions, view ABIs)
//!     → ledger.rs (submit, wait for receipt, typed view reads)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod contracts;
pub mod ledger;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use contracts::ContractCall;
pub use ledger::{AlloyLedger, Ledger};
pub use types::{
    BlockchainError, BlockchainResult, CertificationSummary, ChainId, ReceiptStatus,
    StudentRecord,
};
pub use wallet::Wallet;
