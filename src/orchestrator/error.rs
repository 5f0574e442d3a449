//! Orchestration errors and their user-facing classification.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::BlockchainError;
use crate::names::{NameError, ResolveError};
use crate::orchestrator::units::AmountError;
use crate::storage::StorageError;

/// Failure categories surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    DuplicateAddress,
    Upload,
    Submission,
    Reverted,
    ReceiptTimeout,
    NotRegistered,
    NameClaim,
    Unavailable,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::DuplicateAddress => "duplicate_address",
            ErrorKind::Upload => "upload",
            ErrorKind::Submission => "submission",
            ErrorKind::Reverted => "reverted",
            ErrorKind::ReceiptTimeout => "receipt_timeout",
            ErrorKind::NotRegistered => "not_registered",
            ErrorKind::NameClaim => "name_claim",
            ErrorKind::Unavailable => "unavailable",
        }
    }
}

/// A classified failure: category plus a one-line message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ActionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Upload failed: {0}")]
    Upload(#[from] StorageError),

    #[error(transparent)]
    Chain(#[from] BlockchainError),

    #[error("Transaction reverted")]
    Reverted,

    #[error("Student {0} is not registered")]
    NotRegistered(String),

    #[error("Card {0} is already registered")]
    AlreadyRegistered(String),

    #[error("Name claim failed: {0}")]
    NameClaim(#[from] NameError),
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::Validation(_)
            | OrchestratorError::Amount(_)
            | OrchestratorError::AlreadyRegistered(_)
            | OrchestratorError::Resolve(ResolveError::Empty) => ErrorKind::Validation,
            OrchestratorError::Resolve(ResolveError::DuplicateAddress { .. }) => {
                ErrorKind::DuplicateAddress
            }
            OrchestratorError::Upload(_) => ErrorKind::Upload,
            OrchestratorError::Chain(BlockchainError::ReceiptTimeout(_)) => {
                ErrorKind::ReceiptTimeout
            }
            OrchestratorError::Chain(BlockchainError::Rpc(_) | BlockchainError::Timeout(_)) => {
                ErrorKind::Unavailable
            }
            OrchestratorError::Chain(_) => ErrorKind::Submission,
            OrchestratorError::Reverted => ErrorKind::Reverted,
            OrchestratorError::NotRegistered(_) => ErrorKind::NotRegistered,
            OrchestratorError::NameClaim(_) => ErrorKind::NameClaim,
        }
    }

    pub fn classify(&self) -> ActionError {
        ActionError::new(self.kind(), first_line(&self.to_string()))
    }
}

/// Leading part of a possibly multi-line error, cut at the first newline
/// or the first `" - "` separator.
pub fn first_line(message: &str) -> &str {
    let end = [message.find('\n'), message.find(" - ")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(message.len());
    message[..end].trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("execution reverted\nstack: ..."), "execution reverted");
        assert_eq!(
            first_line("insufficient funds - Version: viem@2 - Details"),
            "insufficient funds"
        );
        assert_eq!(first_line("  plain  "), "plain");
        assert_eq!(first_line(""), "");
    }

    #[test]
    fn test_classification_kinds() {
        let cases = [
            (OrchestratorError::Validation("x".into()), ErrorKind::Validation),
            (OrchestratorError::Resolve(ResolveError::Empty), ErrorKind::Validation),
            (
                OrchestratorError::Resolve(ResolveError::DuplicateAddress {
                    address: "0x1".into(),
                    tokens: vec!["a".into(), "b".into()],
                }),
                ErrorKind::DuplicateAddress,
            ),
            (OrchestratorError::Upload(StorageError::NoFiles), ErrorKind::Upload),
            (
                OrchestratorError::Chain(BlockchainError::ReceiptTimeout(300)),
                ErrorKind::ReceiptTimeout,
            ),
            (OrchestratorError::Chain(BlockchainError::Timeout(10)), ErrorKind::Unavailable),
            (
                OrchestratorError::Chain(BlockchainError::Submission("nonce too low".into())),
                ErrorKind::Submission,
            ),
            (OrchestratorError::Reverted, ErrorKind::Reverted),
            (OrchestratorError::NotRegistered("A1".into()), ErrorKind::NotRegistered),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{}", err);
        }
    }

    #[test]
    fn test_classify_truncates_message() {
        let err = OrchestratorError::Chain(BlockchainError::Submission(
            "user rejected\nfull trace".into(),
        ));
        let classified = err.classify();
        assert_eq!(classified.kind, ErrorKind::Submission);
        assert_eq!(classified.message, "Submission failed: user rejected");
    }
}
