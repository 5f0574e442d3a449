//! Student registration workflow.
//!
//! ```text
//! UploadingImage → SubmittingRequest → ProcessingTransaction
//!     → AwaitingOracle (countdown) → RegisteringName → Complete
//! ```
//!
//! Any stage may end in `Failed`, which records the stage it failed at.
//! Nothing is rolled back: an uploaded image or a mined request stays.

use alloy::primitives::TxHash;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant};

use crate::blockchain::{ReceiptStatus, StudentRecord};
use crate::observability::metrics;
use crate::orchestrator::actions::Orchestrator;
use crate::orchestrator::error::{ActionError, OrchestratorError};
use crate::orchestrator::sessions::Terminal;
use crate::storage::FilePayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStage {
    UploadingImage,
    SubmittingRequest,
    ProcessingTransaction,
    AwaitingOracle,
    RegisteringName,
    Complete,
    Failed,
}

impl RegistrationStage {
    pub fn label(self) -> &'static str {
        match self {
            RegistrationStage::UploadingImage => "uploading_image",
            RegistrationStage::SubmittingRequest => "submitting_request",
            RegistrationStage::ProcessingTransaction => "processing_transaction",
            RegistrationStage::AwaitingOracle => "awaiting_oracle",
            RegistrationStage::RegisteringName => "registering_name",
            RegistrationStage::Complete => "complete",
            RegistrationStage::Failed => "failed",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RegistrationStage::UploadingImage => "Uploading picture to IPFS",
            RegistrationStage::SubmittingRequest => {
                "Creating Student Record in Luca3Auth Smart Contract"
            }
            RegistrationStage::ProcessingTransaction => "Processing Transaction",
            RegistrationStage::AwaitingOracle => "Transaction Done, waiting for the registry",
            RegistrationStage::RegisteringName => "Registering ENS for Student",
            RegistrationStage::Complete => "Student NFT Wallet Registered @ ENS name",
            RegistrationStage::Failed => "Registration failed",
        }
    }
}

/// Input for one registration.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub card_uid: String,
    pub student_id: u64,
    pub image: FilePayload,
    /// Requested name label. Defaults to the lowercase display id.
    pub name: Option<String>,
}

/// Observable state of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationProgress {
    pub card_uid: String,
    pub stage: RegistrationStage,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<RegistrationStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentRecord>,
}

impl RegistrationProgress {
    pub fn new(card_uid: &str) -> Self {
        Self {
            card_uid: card_uid.to_string(),
            stage: RegistrationStage::UploadingImage,
            description: RegistrationStage::UploadingImage.description(),
            remaining_secs: None,
            tx_hash: None,
            failed_at: None,
            error: None,
            image_reference: None,
            name: None,
            student: None,
        }
    }
}

impl Terminal for RegistrationProgress {
    fn is_terminal(&self) -> bool {
        matches!(
            self.stage,
            RegistrationStage::Complete | RegistrationStage::Failed
        )
    }
}

/// Count down from `secs` to zero, one step per elapsed second.
///
/// `on_tick` sees `secs` immediately, then every value down to 0.
pub async fn countdown(secs: u32, mut on_tick: impl FnMut(u32)) {
    on_tick(secs);
    let period = Duration::from_secs(1);
    let mut ticker = interval_at(Instant::now() + period, period);
    let mut remaining = secs;
    while remaining > 0 {
        ticker.tick().await;
        remaining -= 1;
        on_tick(remaining);
    }
}

/// Drives one registration and publishes progress.
pub struct RegistrationWorkflow {
    orchestrator: Orchestrator,
    oracle_wait_secs: u32,
    progress: watch::Sender<RegistrationProgress>,
}

impl RegistrationWorkflow {
    pub fn new(orchestrator: Orchestrator, oracle_wait_secs: u32, card_uid: &str) -> Self {
        let (progress, _) = watch::channel(RegistrationProgress::new(card_uid));
        Self {
            orchestrator,
            oracle_wait_secs,
            progress,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistrationProgress> {
        self.progress.subscribe()
    }

    pub fn current(&self) -> RegistrationProgress {
        self.progress.borrow().clone()
    }

    pub async fn run(&self, request: RegistrationRequest) -> RegistrationProgress {
        metrics::record_registration_stage(RegistrationStage::UploadingImage.label());
        tracing::info!(
            card_uid = %request.card_uid,
            student_id = request.student_id,
            "Registration started"
        );

        if let Err(e) = self.drive(request).await {
            self.fail(&e);
        }
        self.current()
    }

    async fn drive(&self, request: RegistrationRequest) -> Result<(), OrchestratorError> {
        let services = self.orchestrator.services();

        if self.orchestrator.student(&request.card_uid).await?.is_some() {
            return Err(OrchestratorError::AlreadyRegistered(request.card_uid));
        }

        let image = services.storage.upload(vec![request.image]).await?;
        let locator = image.locator();
        self.progress.send_modify(|p| p.image_reference = Some(locator));

        self.advance(RegistrationStage::SubmittingRequest);
        let call = self
            .orchestrator
            .register_student_call(&request.card_uid, request.student_id, &image);
        let tx_hash = services.ledger.submit(&call).await?;
        self.progress.send_modify(|p| p.tx_hash = Some(tx_hash));

        self.advance(RegistrationStage::ProcessingTransaction);
        match services.ledger.wait_for_receipt(tx_hash).await? {
            ReceiptStatus::Success => {}
            ReceiptStatus::Reverted => return Err(OrchestratorError::Reverted),
        }

        self.advance(RegistrationStage::AwaitingOracle);
        countdown(self.oracle_wait_secs, |remaining| {
            self.progress.send_modify(|p| p.remaining_secs = Some(remaining));
        })
        .await;

        let student = self
            .orchestrator
            .student(&request.card_uid)
            .await?
            .ok_or_else(|| OrchestratorError::NotRegistered(request.card_uid.clone()))?;

        self.advance(RegistrationStage::RegisteringName);
        let label = request
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| student.display_id().to_lowercase());
        services
            .resolver
            .claim(&label, &student.wallet_address.to_checksum(None))
            .await?;
        let full_name = format!("{}.{}", label, services.resolver.domain());

        services.balances.invalidate(student.wallet_address);
        tracing::info!(
            card_uid = %request.card_uid,
            name = %full_name,
            wallet = %student.wallet_address,
            "Registration complete"
        );
        self.progress.send_modify(|p| {
            p.name = Some(full_name);
            p.student = Some(student);
        });
        self.advance(RegistrationStage::Complete);
        metrics::record_action("register_student", "confirmed");
        Ok(())
    }

    fn advance(&self, stage: RegistrationStage) {
        let moved = self.progress.send_if_modified(|p| {
            if stage <= p.stage || p.stage == RegistrationStage::Failed {
                return false;
            }
            p.stage = stage;
            p.description = stage.description();
            if stage != RegistrationStage::AwaitingOracle {
                p.remaining_secs = None;
            }
            true
        });
        if moved {
            metrics::record_registration_stage(stage.label());
            tracing::debug!(stage = stage.label(), "Registration stage");
        }
    }

    fn fail(&self, err: &OrchestratorError) {
        let error = err.classify();
        let at = self.progress.borrow().stage;
        tracing::warn!(
            stage = at.label(),
            kind = error.kind.as_str(),
            error = %err,
            "Registration failed"
        );
        self.progress.send_modify(|p| {
            p.failed_at = Some(at);
            p.stage = RegistrationStage::Failed;
            p.description = RegistrationStage::Failed.description();
            p.error = Some(error);
        });
        metrics::record_registration_stage(RegistrationStage::Failed.label());
        metrics::record_action("register_student", "failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_once_per_second() {
        let start = Instant::now();
        let mut seen = Vec::new();
        countdown(90, |remaining| seen.push((remaining, start.elapsed().as_secs()))).await;

        assert_eq!(seen.len(), 91);
        for (i, (remaining, elapsed)) in seen.iter().enumerate() {
            assert_eq!(*remaining, 90 - i as u32);
            assert_eq!(*elapsed, i as u64);
        }
        assert_eq!(start.elapsed(), Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_countdown_returns_immediately() {
        let mut seen = Vec::new();
        countdown(0, |remaining| seen.push(remaining)).await;
        assert_eq!(seen, vec![0]);
    }

    #[test]
    fn test_stage_order() {
        assert!(RegistrationStage::UploadingImage < RegistrationStage::SubmittingRequest);
        assert!(RegistrationStage::AwaitingOracle < RegistrationStage::RegisteringName);
        assert!(RegistrationStage::Complete < RegistrationStage::Failed);
    }

    #[test]
    fn test_terminal_stages() {
        let mut progress = RegistrationProgress::new("A1");
        assert!(!progress.is_terminal());
        progress.stage = RegistrationStage::Complete;
        assert!(progress.is_terminal());
    }
}
