//! View models: workflow state mapped to `loading | form | result | error`.

use serde::Serialize;

use crate::blockchain::{CertificationSummary, StudentRecord};
use crate::config::ChainConfig;
use crate::orchestrator::{ActionStatus, RegistrationProgress, RegistrationStage, TxState};
use crate::storage::ContentRef;
use crate::treasury::BalanceView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewState {
    Loading,
    Form,
    Result,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct View<T> {
    pub view: ViewState,
    #[serde(flatten)]
    pub body: T,
}

impl<T> View<T> {
    pub fn new(view: ViewState, body: T) -> Self {
        Self { view, body }
    }
}

pub fn action_view(status: ActionStatus, chain: &ChainConfig) -> View<ActionBody> {
    let view = match status.state {
        TxState::Idle => ViewState::Form,
        TxState::Pending | TxState::Submitted { .. } => ViewState::Loading,
        TxState::Confirmed { .. } => ViewState::Result,
        TxState::Failed { .. } => ViewState::Error,
    };
    let explorer_url = status
        .state
        .tx_hash()
        .map(|hash| chain.tx_link(&hash.to_string()));
    View::new(
        view,
        ActionBody {
            status,
            explorer_url,
        },
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionBody {
    #[serde(flatten)]
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

/// Stages shown to the user, in order.
pub const REGISTRATION_STAGES: [RegistrationStage; 6] = [
    RegistrationStage::UploadingImage,
    RegistrationStage::SubmittingRequest,
    RegistrationStage::ProcessingTransaction,
    RegistrationStage::AwaitingOracle,
    RegistrationStage::RegisteringName,
    RegistrationStage::Complete,
];

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationBody {
    pub stages: Vec<&'static str>,
    /// Index into `stages` of the current (or failed) stage.
    pub current_stage: usize,
    #[serde(flatten)]
    pub progress: RegistrationProgress,
}

pub fn registration_view(progress: RegistrationProgress) -> View<RegistrationBody> {
    let view = match progress.stage {
        RegistrationStage::Complete => ViewState::Result,
        RegistrationStage::Failed => ViewState::Error,
        _ => ViewState::Loading,
    };
    let shown = progress.failed_at.unwrap_or(progress.stage);
    let current_stage = REGISTRATION_STAGES
        .iter()
        .position(|s| *s == shown)
        .unwrap_or(0);
    View::new(
        view,
        RegistrationBody {
            stages: REGISTRATION_STAGES.iter().map(|s| s.description()).collect(),
            current_stage,
            progress,
        },
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentProfile {
    pub card_uid: String,
    pub student_id: u64,
    pub display_id: String,
    pub image_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    pub wallet_address: String,
    pub wallet_explorer_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balances: Option<BalanceView>,
}

impl StudentProfile {
    pub fn new(card_uid: &str, record: StudentRecord, chain: &ChainConfig) -> Self {
        let wallet_address = record.wallet_address.to_checksum(None);
        Self {
            card_uid: card_uid.to_string(),
            student_id: record.student_id,
            display_id: record.display_id(),
            image_uri: ContentRef::parse(&record.image_reference)
                .ok()
                .map(|r| r.uri()),
            image_reference: record.image_reference,
            wallet_explorer_url: chain.address_link(&wallet_address),
            wallet_address,
            name: None,
            balances: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnregisteredCard {
    pub card_uid: String,
    pub prompt: &'static str,
}

impl UnregisteredCard {
    pub fn new(card_uid: &str) -> View<Self> {
        View::new(
            ViewState::Form,
            Self {
                card_uid: card_uid.to_string(),
                prompt: "This card is not registered yet. Register the student to continue.",
            },
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificationItem {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
}

impl From<CertificationSummary> for CertificationItem {
    fn from(summary: CertificationSummary) -> Self {
        let name = serde_json::from_str::<serde_json::Value>(&summary.metadata)
            .ok()
            .and_then(|v| v.get("name").and_then(|n| n.as_str()).map(str::to_string));
        let image_uri = summary
            .image_reference
            .as_deref()
            .and_then(|r| ContentRef::parse(r).ok())
            .map(|r| r.uri());
        Self {
            id: summary.id,
            name,
            image_reference: summary.image_reference,
            image_uri,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificationList {
    pub card_uid: String,
    pub certifications: Vec<CertificationItem>,
}
