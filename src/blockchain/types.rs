//! Chain-specific types and error definitions.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export ChainConfig from config module to avoid duplication
pub use crate::config::schema::ChainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// No receipt was observed within the configured window.
    #[error("Receipt not available after {0} seconds")]
    ReceiptTimeout(u64),

    /// Signing or broadcast was rejected.
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Call description could not be ABI-encoded.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// View call returned data that does not decode.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Outcome carried by a mined receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

impl ReceiptStatus {
    pub fn from_status(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Reverted
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// A student as recorded on the Luca3Auth registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: u64,
    /// Content locator of the profile picture (`<cid>/<file>`).
    pub image_reference: String,
    /// Token-bound account acting as the student's treasury.
    pub wallet_address: Address,
}

impl StudentRecord {
    /// Campus-style id: five-digit ids are zero-padded to `TP0xxxxx`.
    pub fn display_id(&self) -> String {
        display_student_id(self.student_id)
    }
}

/// Format a raw student id the way campus cards print it.
pub fn display_student_id(student_id: u64) -> String {
    let digits = student_id.to_string();
    if digits.len() == 5 {
        format!("TP0{}", digits)
    } else {
        format!("TP{}", digits)
    }
}

/// A certification as listed for a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationSummary {
    pub id: u64,
    /// Raw metadata string stored on chain.
    pub metadata: String,
    /// Image locator extracted from the metadata, when present.
    pub image_reference: Option<String>,
}

impl CertificationSummary {
    pub fn from_metadata(id: u64, metadata: String) -> Self {
        let image_reference = serde_json::from_str::<serde_json::Value>(&metadata)
            .ok()
            .and_then(|v| v.get("image").and_then(|i| i.as_str()).map(str::to_string))
            .or_else(|| {
                // Older records store the bare locator.
                (!metadata.trim_start().starts_with('{') && !metadata.is_empty())
                    .then(|| metadata.clone())
            });
        Self {
            id,
            metadata,
            image_reference,
        }
    }
}
