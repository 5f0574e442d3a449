//! Workflow orchestration.
//!
//! # Data Flow
//! ```text
//! validated form input
//!     → actions.rs / registration.rs (prepare, submit, wait)
//!     → status.rs (forward-only lifecycle, published on a watch channel)
//!     → sessions.rs (looked up by id while running and after)
//! ```
//!
//! External systems are reached only through the `Services` bundle, so
//! every workflow can run against in-memory fakes.

pub mod actions;
pub mod error;
pub mod registration;
pub mod sessions;
pub mod status;
pub mod units;

use std::sync::Arc;

use crate::blockchain::Ledger;
use crate::names::IdentityResolver;
use crate::pricing::RateCache;
use crate::storage::ContentStore;
use crate::treasury::BalanceCache;

pub use actions::{CertificationRequest, ContractAddresses, Orchestrator};
pub use error::{ActionError, ErrorKind, OrchestratorError};
pub use registration::{
    RegistrationProgress, RegistrationRequest, RegistrationStage, RegistrationWorkflow,
};
pub use sessions::SessionRegistry;
pub use status::{ActionKind, ActionStatus, ActionTracker, TxState};
pub use units::{parse_amount, Amount, AmountError, Token};

/// External collaborators shared by every workflow.
#[derive(Clone)]
pub struct Services {
    pub ledger: Arc<dyn Ledger>,
    pub resolver: IdentityResolver,
    pub storage: Arc<dyn ContentStore>,
    pub balances: BalanceCache,
    pub rates: RateCache,
}
