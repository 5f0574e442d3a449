//! Transaction lifecycle tracking.
//!
//! ```text
//! Idle → Pending → Submitted → Confirmed
//!          │           │
//!          └───────────┴──→ Failed
//! ```
//!
//! Transitions only move forward. A terminal state never changes again, and
//! a hash is attached exactly when the node accepted the transaction.

use alloy::primitives::TxHash;
use serde::Serialize;
use tokio::sync::watch;

use crate::observability::metrics;
use crate::orchestrator::error::{ActionError, ErrorKind, OrchestratorError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TxState {
    Idle,
    Pending,
    Submitted {
        tx_hash: TxHash,
    },
    Confirmed {
        tx_hash: TxHash,
    },
    Failed {
        tx_hash: Option<TxHash>,
        error: ActionError,
    },
}

impl TxState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxState::Confirmed { .. } | TxState::Failed { .. })
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            TxState::Submitted { tx_hash } | TxState::Confirmed { tx_hash } => Some(*tx_hash),
            TxState::Failed { tx_hash, .. } => *tx_hash,
            TxState::Idle | TxState::Pending => None,
        }
    }

    pub fn can_transition_to(&self, next: &TxState) -> bool {
        match (self, next) {
            (TxState::Idle, TxState::Pending) => true,
            (TxState::Idle | TxState::Pending, TxState::Failed { tx_hash: None, .. }) => true,
            (TxState::Pending, TxState::Submitted { .. }) => true,
            (TxState::Submitted { tx_hash }, TxState::Confirmed { tx_hash: next })
            | (TxState::Submitted { tx_hash }, TxState::Failed { tx_hash: Some(next), .. }) => {
                tx_hash == next
            }
            _ => false,
        }
    }
}

/// The user actions that end in a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    RegisterStudent,
    CreateCertification,
    ClaimCertification,
    WithdrawUsdc,
    SwapEthForUsdc,
    SendUsdc,
    SendEth,
}

impl ActionKind {
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::RegisterStudent => "register_student",
            ActionKind::CreateCertification => "create_certification",
            ActionKind::ClaimCertification => "claim_certification",
            ActionKind::WithdrawUsdc => "withdraw_usdc",
            ActionKind::SwapEthForUsdc => "swap_eth_for_usdc",
            ActionKind::SendUsdc => "send_usdc",
            ActionKind::SendEth => "send_eth",
        }
    }

    pub fn pending_message(self) -> &'static str {
        match self {
            ActionKind::RegisterStudent => "Registering student...",
            ActionKind::CreateCertification => "Uploading certificate image...",
            ActionKind::ClaimCertification => "Claiming...",
            ActionKind::WithdrawUsdc => "Withdrawing USDC...",
            ActionKind::SwapEthForUsdc => "Swapping ETH for USDC...",
            ActionKind::SendUsdc => "Sending USDC...",
            ActionKind::SendEth => "Sending ETH...",
        }
    }

    fn failure_prefix(self) -> &'static str {
        match self {
            ActionKind::RegisterStudent => "Registration failed",
            ActionKind::CreateCertification => "Creation failed",
            ActionKind::ClaimCertification => "Claim failed",
            ActionKind::WithdrawUsdc => "Withdrawal failed",
            ActionKind::SwapEthForUsdc => "Swap failed",
            ActionKind::SendUsdc | ActionKind::SendEth => "Transfer failed",
        }
    }

    /// Status line for a failure: `"Claim failed."` for reverts,
    /// `"Claim failed: <message>"` otherwise.
    pub fn failure_message(self, error: &ActionError) -> String {
        if error.kind == ErrorKind::Reverted || error.message.is_empty() {
            format!("{}.", self.failure_prefix())
        } else {
            format!("{}: {}", self.failure_prefix(), error.message)
        }
    }
}

/// Snapshot of one action as published to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionStatus {
    pub action: ActionKind,
    #[serde(flatten)]
    pub state: TxState,
    pub message: String,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Owns the lifecycle of a single action and publishes every change.
#[derive(Debug)]
pub struct ActionTracker {
    tx: watch::Sender<ActionStatus>,
    success_message: String,
}

impl ActionTracker {
    pub fn new(action: ActionKind, success_message: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(ActionStatus {
            action,
            state: TxState::Idle,
            message: String::new(),
        });
        Self {
            tx,
            success_message: success_message.into(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ActionStatus> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ActionStatus {
        self.tx.borrow().clone()
    }

    pub fn action(&self) -> ActionKind {
        self.tx.borrow().action
    }

    pub fn begin(&self) -> bool {
        let message = self.action().pending_message().to_string();
        self.transition(TxState::Pending, message)
    }

    /// Update the status line without changing state.
    pub fn progress(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_if_modified(|status| {
            if status.state.is_terminal() {
                return false;
            }
            status.message = message;
            true
        });
    }

    pub fn submitted(&self, tx_hash: TxHash) -> bool {
        self.transition(
            TxState::Submitted { tx_hash },
            "Transaction submitted, waiting for confirmation...".to_string(),
        )
    }

    pub fn confirmed(&self, tx_hash: TxHash) -> bool {
        let message = self.success_message.clone();
        let moved = self.transition(TxState::Confirmed { tx_hash }, message);
        if moved {
            metrics::record_action(self.action().label(), "confirmed");
        }
        moved
    }

    pub fn failed(&self, tx_hash: Option<TxHash>, err: &OrchestratorError) -> bool {
        let error = err.classify();
        let message = self.action().failure_message(&error);
        tracing::warn!(
            action = self.action().label(),
            kind = error.kind.as_str(),
            tx_hash = ?tx_hash,
            error = %err,
            "Action failed"
        );
        let moved = self.transition(TxState::Failed { tx_hash, error }, message);
        if moved {
            metrics::record_action(self.action().label(), "failed");
        }
        moved
    }

    fn transition(&self, next: TxState, message: String) -> bool {
        self.tx.send_if_modified(|status| {
            if !status.state.can_transition_to(&next) {
                tracing::debug!(
                    from = ?status.state,
                    to = ?next,
                    "Ignoring out-of-order transition"
                );
                return false;
            }
            status.state = next;
            status.message = message;
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> TxHash {
        TxHash::repeat_byte(byte)
    }

    #[test]
    fn test_happy_path() {
        let tracker = ActionTracker::new(
            ActionKind::ClaimCertification,
            "Successfully claimed certification 3.",
        );
        assert!(tracker.begin());
        assert_eq!(tracker.current().message, "Claiming...");
        assert!(tracker.submitted(hash(1)));
        assert!(tracker.confirmed(hash(1)));

        let status = tracker.current();
        assert_eq!(status.state, TxState::Confirmed { tx_hash: hash(1) });
        assert_eq!(status.message, "Successfully claimed certification 3.");
    }

    #[test]
    fn test_terminal_states_are_final() {
        let tracker = ActionTracker::new(ActionKind::WithdrawUsdc, "done");
        tracker.begin();
        tracker.submitted(hash(1));
        assert!(tracker.failed(Some(hash(1)), &OrchestratorError::Reverted));

        assert!(!tracker.confirmed(hash(1)));
        assert!(!tracker.begin());
        tracker.progress("ignored");
        let status = tracker.current();
        assert!(matches!(status.state, TxState::Failed { .. }));
        assert_eq!(status.message, "Withdrawal failed.");
    }

    #[test]
    fn test_no_confirmation_without_submission() {
        let tracker = ActionTracker::new(ActionKind::SendUsdc, "done");
        tracker.begin();
        assert!(!tracker.confirmed(hash(1)));
        assert!(!tracker.failed(Some(hash(1)), &OrchestratorError::Reverted));
        assert_eq!(tracker.current().state, TxState::Pending);
    }

    #[test]
    fn test_hash_must_match_submission() {
        let tracker = ActionTracker::new(ActionKind::SendEth, "done");
        tracker.begin();
        tracker.submitted(hash(1));
        assert!(!tracker.confirmed(hash(2)));
    }

    #[test]
    fn test_failure_before_submission_has_no_hash() {
        let tracker = ActionTracker::new(ActionKind::ClaimCertification, "done");
        tracker.begin();
        let err = OrchestratorError::Validation("Please enter a valid certification id".into());
        assert!(tracker.failed(None, &err));

        let status = tracker.current();
        assert_eq!(status.state.tx_hash(), None);
        assert_eq!(
            status.message,
            "Claim failed: Please enter a valid certification id"
        );
    }

    #[test]
    fn test_subscribers_observe_changes() {
        let tracker = ActionTracker::new(ActionKind::SwapEthForUsdc, "done");
        let rx = tracker.subscribe();
        tracker.begin();
        assert_eq!(rx.borrow().state, TxState::Pending);
    }
}
