//! Ledger boundary: submission, receipt polling, and typed view reads.
//!
//! # Responsibilities
//! - Encode a `ContractCall`, sign and broadcast it, return the tx hash
//! - Poll for the receipt with backoff until a status is available
//! - Read the Luca3Auth registry and ERC-20 balances
//!
//! The orchestrator only sees the `Ledger` trait, so tests run without a
//! node.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::contracts::{
    admin_Call, balanceOfCall, certifications_Call, getCertificationsCall, students_Call,
    ContractCall,
};
use crate::blockchain::types::{BlockchainError, BlockchainResult, ReceiptStatus, StudentRecord};
use crate::blockchain::wallet::Wallet;
use crate::resilience::backoff::Backoff;

/// Everything the orchestration layer needs from the chain.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Address transactions are sent from.
    fn signer_address(&self) -> Address;

    /// Sign and broadcast a call. Returns once the node accepted it.
    async fn submit(&self, call: &ContractCall) -> BlockchainResult<TxHash>;

    /// Block until the receipt for `tx_hash` is available.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> BlockchainResult<ReceiptStatus>;

    /// Student registered under a card UID, if any.
    async fn student(&self, card_uid: &str) -> BlockchainResult<Option<StudentRecord>>;

    /// Registry administrator.
    async fn admin(&self) -> BlockchainResult<Address>;

    /// Certification ids held by the student behind `card_uid`.
    async fn certifications(&self, card_uid: &str) -> BlockchainResult<Vec<u64>>;

    /// Raw metadata of a certification.
    async fn certification_metadata(&self, certification_id: u64) -> BlockchainResult<String>;

    /// Native-coin balance in wei.
    async fn native_balance(&self, address: Address) -> BlockchainResult<U256>;

    /// ERC-20 balance in the token's smallest unit.
    async fn token_balance(&self, token: Address, owner: Address) -> BlockchainResult<U256>;
}

/// `Ledger` backed by a JSON-RPC node and a local signer.
pub struct AlloyLedger {
    client: BlockchainClient,
    /// Wallet-filled provider used for submissions (nonce, gas, chain id).
    signing: Arc<dyn Provider + Send + Sync>,
    signer: Address,
    registry: Address,
}

impl AlloyLedger {
    pub fn new(
        client: BlockchainClient,
        wallet: &Wallet,
        registry: Address,
    ) -> BlockchainResult<Self> {
        let url: url::Url = client.config().rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", client.config().rpc_url, e))
        })?;
        let signing = ProviderBuilder::new()
            .wallet(wallet.to_ethereum_wallet())
            .connect_http(url);

        Ok(Self {
            client,
            signing: Arc::new(signing),
            signer: wallet.address(),
            registry,
        })
    }

    async fn view<C>(&self, to: Address, call: C) -> BlockchainResult<C::Return>
    where
        C: SolCall + Send + Sync,
    {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(call.abi_encode());
        let output = self.client.call(tx).await?;
        C::abi_decode_returns(&output)
            .map_err(|e| BlockchainError::Decoding(format!("{}: {}", C::SIGNATURE, e)))
    }

    async fn check_gas_price(&self) -> BlockchainResult<()> {
        let gas_price = self.client.get_gas_price().await?;
        let gas_price_gwei = gas_price / 1_000_000_000;
        let max_gwei = self.client.config().max_gas_price_gwei;
        if gas_price_gwei > max_gwei as u128 {
            return Err(BlockchainError::GasPriceTooHigh {
                current_gwei: gas_price_gwei as u64,
                max_gwei,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for AlloyLedger {
    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn submit(&self, call: &ContractCall) -> BlockchainResult<TxHash> {
        let input = call.calldata()?;
        self.check_gas_price().await?;

        let tx = TransactionRequest::default()
            .with_from(self.signer)
            .with_to(call.target)
            .with_value(call.value)
            .with_input(input);

        let rpc_timeout = self.client.timeout_duration();
        let pending = timeout(rpc_timeout, self.signing.send_transaction(tx))
            .await
            .map_err(|_| BlockchainError::Timeout(rpc_timeout.as_secs()))?
            .map_err(|e| BlockchainError::Submission(e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(
            tx_hash = %tx_hash,
            target = %call.target,
            method = call.method(),
            "Transaction broadcast"
        );
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> BlockchainResult<ReceiptStatus> {
        let config = self.client.config();
        let deadline = Duration::from_secs(config.receipt_timeout_secs);
        let mut backoff = Backoff::new(config.receipt_poll_ms, config.receipt_poll_max_ms);

        let result = timeout(deadline, async {
            loop {
                match self.client.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => {
                        let status = ReceiptStatus::from_status(receipt.status());
                        tracing::info!(
                            tx_hash = %tx_hash,
                            block_number = ?receipt.block_number,
                            status = ?status,
                            "Receipt observed"
                        );
                        return status;
                    }
                    Ok(None) => tracing::debug!(tx_hash = %tx_hash, "Transaction pending"),
                    Err(e) => tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt poll failed"),
                }
                sleep(backoff.next_delay()).await;
            }
        })
        .await;

        result.map_err(|_| BlockchainError::ReceiptTimeout(config.receipt_timeout_secs))
    }

    async fn student(&self, card_uid: &str) -> BlockchainResult<Option<StudentRecord>> {
        let record = self
            .view(
                self.registry,
                students_Call {
                    cardUID: card_uid.to_string(),
                },
            )
            .await?;

        if record.tba.is_zero() {
            return Ok(None);
        }
        let student_id = u64::try_from(record.studentId).map_err(|_| {
            BlockchainError::Decoding(format!("student id {} overflows", record.studentId))
        })?;

        Ok(Some(StudentRecord {
            student_id,
            image_reference: record.metadata,
            wallet_address: record.tba,
        }))
    }

    async fn admin(&self) -> BlockchainResult<Address> {
        self.view(self.registry, admin_Call {}).await
    }

    async fn certifications(&self, card_uid: &str) -> BlockchainResult<Vec<u64>> {
        let ids = self
            .view(
                self.registry,
                getCertificationsCall {
                    cardUID: card_uid.to_string(),
                },
            )
            .await?;
        ids.into_iter()
            .map(|id| {
                u64::try_from(id).map_err(|_| {
                    BlockchainError::Decoding(format!("certification id {} overflows", id))
                })
            })
            .collect()
    }

    async fn certification_metadata(&self, certification_id: u64) -> BlockchainResult<String> {
        self.view(
            self.registry,
            certifications_Call {
                certificationId: U256::from(certification_id),
            },
        )
        .await
    }

    async fn native_balance(&self, address: Address) -> BlockchainResult<U256> {
        self.client.get_balance(address).await
    }

    async fn token_balance(&self, token: Address, owner: Address) -> BlockchainResult<U256> {
        self.view(token, balanceOfCall { owner }).await
    }
}

impl std::fmt::Debug for AlloyLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyLedger")
            .field("client", &self.client)
            .field("signer", &self.signer)
            .field("registry", &self.registry)
            .finish()
    }
}
