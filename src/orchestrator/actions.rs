//! Transaction-producing actions.
//!
//! Every action follows the same path: prepare the call (uploads, lookups,
//! resolution), submit it, and wait for the receipt. Anything that fails
//! during preparation ends the action before a transaction exists.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, U256};
use futures_util::future::join_all;
use std::collections::HashSet;
use std::future::Future;

use crate::blockchain::contracts::{
    uint, uint256, ContractCall, CLAIM_CERTIFICATION, CREATE_CERTIFICATION, REGISTER_STUDENT,
    SWAP_ETH_FOR_USDC, TBA_EXECUTE, TRANSFER_USDC, WITHDRAW_USDC,
};
use crate::blockchain::{CertificationSummary, ReceiptStatus, StudentRecord};
use crate::config::ContractsConfig;
use crate::names::resolver::split_tokens;
use crate::names::ResolveError;
use crate::orchestrator::error::OrchestratorError;
use crate::orchestrator::status::{ActionStatus, ActionTracker};
use crate::orchestrator::units::{Amount, Token};
use crate::orchestrator::Services;
use crate::storage::{ContentRef, FilePayload};

/// `operation` value for a plain call through a token-bound account.
const CALL_OPERATION: u8 = 0;

/// Deployed contract addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub registry: Address,
    pub treasury: Address,
    pub usdc: Address,
}

impl ContractAddresses {
    pub fn from_config(config: &ContractsConfig) -> Result<Self, OrchestratorError> {
        let parse = |field: &str, value: &str| {
            value.parse::<Address>().map_err(|e| {
                OrchestratorError::Validation(format!("contracts.{}: '{}' {}", field, value, e))
            })
        };
        Ok(Self {
            registry: parse("luca3auth", &config.luca3auth)?,
            treasury: parse("treasury", &config.treasury)?,
            usdc: parse("usdc", &config.usdc)?,
        })
    }
}

/// Input for a new certification.
#[derive(Debug, Clone)]
pub struct CertificationRequest {
    pub name: String,
    /// Comma-separated addresses and names.
    pub eligible: String,
    pub image: FilePayload,
}

/// A call ready for submission plus the addresses whose balances it moves.
struct Prepared {
    call: ContractCall,
    touches: Vec<Address>,
}

impl Prepared {
    fn new(call: ContractCall) -> Self {
        let touches = vec![call.target];
        Self { call, touches }
    }

    fn touching(mut self, address: Address) -> Self {
        self.touches.push(address);
        self
    }
}

/// Runs user actions against the injected services.
#[derive(Clone)]
pub struct Orchestrator {
    services: Services,
    contracts: ContractAddresses,
}

impl Orchestrator {
    pub fn new(services: Services, contracts: ContractAddresses) -> Self {
        Self {
            services,
            contracts,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    pub async fn student(
        &self,
        card_uid: &str,
    ) -> Result<Option<StudentRecord>, OrchestratorError> {
        Ok(self.services.ledger.student(card_uid).await?)
    }

    async fn registered_student(&self, card_uid: &str) -> Result<StudentRecord, OrchestratorError> {
        self.student(card_uid)
            .await?
            .ok_or_else(|| OrchestratorError::NotRegistered(card_uid.to_string()))
    }

    /// Certifications held by a student, with their metadata.
    ///
    /// A certification whose metadata cannot be read is skipped.
    pub async fn certifications(
        &self,
        card_uid: &str,
    ) -> Result<Vec<CertificationSummary>, OrchestratorError> {
        let ids = self.services.ledger.certifications(card_uid).await?;
        let ledger = &self.services.ledger;
        let reads = ids.iter().map(|&id| async move {
            (id, ledger.certification_metadata(id).await)
        });

        let mut summaries = Vec::with_capacity(ids.len());
        for (id, metadata) in join_all(reads).await {
            match metadata {
                Ok(metadata) => summaries.push(CertificationSummary::from_metadata(id, metadata)),
                Err(e) => tracing::warn!(
                    certification_id = id,
                    error = %e,
                    "Skipping unreadable certification"
                ),
            }
        }
        Ok(summaries)
    }

    pub fn register_student_call(
        &self,
        card_uid: &str,
        student_id: u64,
        image: &ContentRef,
    ) -> ContractCall {
        ContractCall::new(
            self.contracts.registry,
            REGISTER_STUDENT,
            vec![
                DynSolValue::String(card_uid.to_string()),
                uint(student_id),
                DynSolValue::String(image.locator()),
            ],
        )
    }

    /// Upload the certificate image, resolve the eligible list, and create
    /// the certification.
    pub async fn create_certification(
        &self,
        tracker: &ActionTracker,
        request: CertificationRequest,
    ) -> ActionStatus {
        self.execute(tracker, async {
            let name = request.name.trim();
            if name.is_empty() {
                return Err(OrchestratorError::Validation(
                    "Please enter a certification name".to_string(),
                ));
            }
            if split_tokens(&request.eligible).is_empty() {
                return Err(ResolveError::Empty.into());
            }

            let image = self.services.storage.upload(vec![request.image]).await?;
            tracker.progress("Image uploaded. Resolving ENS addresses...");

            let eligible = self.eligible_addresses(&request.eligible).await?;
            tracker.progress("Sending transaction...");

            let metadata = serde_json::json!({ "name": name, "image": image.locator() });
            let call = ContractCall::new(
                self.contracts.registry,
                CREATE_CERTIFICATION,
                vec![
                    DynSolValue::String(metadata.to_string()),
                    DynSolValue::Array(eligible.into_iter().map(DynSolValue::Address).collect()),
                ],
            );
            Ok(Prepared {
                call,
                touches: Vec::new(),
            })
        })
        .await
    }

    /// Resolve a comma-separated list into distinct addresses.
    pub async fn eligible_addresses(&self, input: &str) -> Result<Vec<Address>, OrchestratorError> {
        let tokens = split_tokens(input);
        let resolved = self.services.resolver.resolve_batch(input).await?;

        let mut seen = HashSet::with_capacity(resolved.len());
        let mut addresses = Vec::with_capacity(resolved.len());
        for (token, value) in tokens.iter().zip(&resolved) {
            let address = parse_address(token, value)?;
            if !seen.insert(address) {
                let clashes = tokens
                    .iter()
                    .zip(&resolved)
                    .filter(|(t, v)| parse_address(t, v).is_ok_and(|a| a == address))
                    .map(|(t, _)| t.clone())
                    .collect();
                return Err(ResolveError::DuplicateAddress {
                    address: address.to_checksum(None),
                    tokens: clashes,
                }
                .into());
            }
            addresses.push(address);
        }
        Ok(addresses)
    }

    pub async fn claim_certification(
        &self,
        tracker: &ActionTracker,
        card_uid: &str,
        certification_id: u64,
    ) -> ActionStatus {
        self.execute(tracker, async {
            let student = self.registered_student(card_uid).await?;
            let call = ContractCall::new(
                student.wallet_address,
                CLAIM_CERTIFICATION,
                vec![uint(certification_id)],
            );
            Ok(Prepared::new(call))
        })
        .await
    }

    /// Admin withdrawal of USDC from the treasury contract.
    pub async fn withdraw_usdc(&self, tracker: &ActionTracker, amount: &Amount) -> ActionStatus {
        self.execute(tracker, async {
            ensure_token(amount, Token::Usdc)?;
            let call = ContractCall::new(
                self.contracts.treasury,
                WITHDRAW_USDC,
                vec![uint256(amount.value)],
            );
            Ok(Prepared::new(call).touching(self.services.ledger.signer_address()))
        })
        .await
    }

    pub async fn swap_eth_for_usdc(
        &self,
        tracker: &ActionTracker,
        card_uid: &str,
        amount: &Amount,
    ) -> ActionStatus {
        self.execute(tracker, async {
            ensure_token(amount, Token::Eth)?;
            let student = self.registered_student(card_uid).await?;
            let call = ContractCall::new(
                student.wallet_address,
                SWAP_ETH_FOR_USDC,
                vec![uint256(amount.value)],
            );
            Ok(Prepared::new(call))
        })
        .await
    }

    /// Send `amount` from the student's treasury to `recipient`, which may
    /// be a literal address or a name.
    pub async fn send(
        &self,
        tracker: &ActionTracker,
        card_uid: &str,
        recipient: &str,
        amount: &Amount,
    ) -> ActionStatus {
        self.execute(tracker, async {
            let recipient_token = recipient.trim();
            if recipient_token.is_empty() {
                return Err(OrchestratorError::Validation(
                    "Please enter a recipient".to_string(),
                ));
            }
            let student = self.registered_student(card_uid).await?;
            let resolved = self.services.resolver.resolve_one(recipient_token).await;
            let to = parse_address(recipient_token, &resolved)?;

            let call = match amount.token {
                Token::Usdc => ContractCall::new(
                    student.wallet_address,
                    TRANSFER_USDC,
                    vec![
                        DynSolValue::Address(self.contracts.usdc),
                        DynSolValue::Address(to),
                        uint256(amount.value),
                    ],
                ),
                Token::Eth => ContractCall::new(
                    student.wallet_address,
                    TBA_EXECUTE,
                    vec![
                        DynSolValue::Address(to),
                        uint256(amount.value),
                        DynSolValue::Bytes(Vec::new()),
                        DynSolValue::Uint(U256::from(CALL_OPERATION), 8),
                    ],
                ),
            };
            Ok(Prepared::new(call).touching(to))
        })
        .await
    }

    async fn execute<F>(&self, tracker: &ActionTracker, prepare: F) -> ActionStatus
    where
        F: Future<Output = Result<Prepared, OrchestratorError>>,
    {
        tracker.begin();

        let prepared = match prepare.await {
            Ok(prepared) => prepared,
            Err(e) => {
                tracker.failed(None, &e);
                return tracker.current();
            }
        };

        let ledger = &self.services.ledger;
        let tx_hash = match ledger.submit(&prepared.call).await {
            Ok(hash) => hash,
            Err(e) => {
                tracker.failed(None, &e.into());
                return tracker.current();
            }
        };
        tracker.submitted(tx_hash);

        match ledger.wait_for_receipt(tx_hash).await {
            Ok(ReceiptStatus::Success) => {
                for address in &prepared.touches {
                    self.services.balances.invalidate(*address);
                }
                tracker.confirmed(tx_hash);
            }
            Ok(ReceiptStatus::Reverted) => {
                tracker.failed(Some(tx_hash), &OrchestratorError::Reverted);
            }
            Err(e) => {
                tracker.failed(Some(tx_hash), &e.into());
            }
        }
        tracker.current()
    }
}

fn ensure_token(amount: &Amount, expected: Token) -> Result<(), OrchestratorError> {
    if amount.token != expected {
        return Err(OrchestratorError::Validation(format!(
            "Expected an amount in {}, got {}",
            expected.symbol(),
            amount.token.symbol()
        )));
    }
    Ok(())
}

fn parse_address(token: &str, resolved: &str) -> Result<Address, OrchestratorError> {
    resolved.parse::<Address>().map_err(|_| {
        OrchestratorError::Validation(format!(
            "'{}' is not a valid address or registered name",
            token
        ))
    })
}
