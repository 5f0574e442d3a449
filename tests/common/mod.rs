//! Shared in-memory collaborators for integration tests.

#![allow(dead_code)]

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use luca3auth::blockchain::{
    BlockchainError, BlockchainResult, ContractCall, Ledger, ReceiptStatus, StudentRecord,
};
use luca3auth::config::AppConfig;
use luca3auth::lifecycle::Shutdown;
use luca3auth::names::{IdentityResolver, NameError, NameRecord, NameService};
use luca3auth::pricing::{PriceError, PriceOracle, RateCache};
use luca3auth::storage::{ContentRef, ContentStore, FilePayload, StorageError};
use luca3auth::treasury::BalanceCache;
use luca3auth::{HttpServer, Orchestrator, Services};
use luca3auth::orchestrator::ContractAddresses;

pub const ADMIN_KEY: &str = "test-admin-key";

pub fn registry() -> Address {
    Address::repeat_byte(0xa1)
}

pub fn treasury() -> Address {
    Address::repeat_byte(0xb2)
}

pub fn usdc() -> Address {
    Address::repeat_byte(0xc3)
}

pub fn signer() -> Address {
    Address::repeat_byte(0x5e)
}

/// Token-bound account handed out when the fake oracle registers a card.
pub fn tba() -> Address {
    Address::repeat_byte(0x7b)
}

pub fn contracts() -> ContractAddresses {
    ContractAddresses {
        registry: registry(),
        treasury: treasury(),
        usdc: usdc(),
    }
}

pub fn student(student_id: u64) -> StudentRecord {
    StudentRecord {
        student_id,
        image_reference: "bafyprofile/me.png".to_string(),
        wallet_address: tba(),
    }
}

/// Ledger that records every submitted call.
///
/// A confirmed `registerStudentRequest` registers the card immediately
/// unless `oracle_registers` is off.
pub struct FakeLedger {
    pub submitted: Mutex<Vec<ContractCall>>,
    pub students: Mutex<HashMap<String, StudentRecord>>,
    pub certifications: Mutex<HashMap<String, Vec<u64>>>,
    pub metadata: Mutex<HashMap<u64, String>>,
    pub receipt: Mutex<ReceiptStatus>,
    pub submit_error: Mutex<Option<String>>,
    pub oracle_registers: Mutex<bool>,
    pub native: U256,
    pub stable: U256,
    pub balance_reads: AtomicUsize,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            students: Mutex::new(HashMap::new()),
            certifications: Mutex::new(HashMap::new()),
            metadata: Mutex::new(HashMap::new()),
            receipt: Mutex::new(ReceiptStatus::Success),
            submit_error: Mutex::new(None),
            oracle_registers: Mutex::new(true),
            native: U256::from(1_500_000_000_000_000_000u64),
            stable: U256::from(25_000_000u64),
            balance_reads: AtomicUsize::new(0),
        }
    }

    pub fn with_student(self, card_uid: &str, record: StudentRecord) -> Self {
        self.students
            .lock()
            .unwrap()
            .insert(card_uid.to_string(), record);
        self
    }

    pub fn with_certification(self, card_uid: &str, id: u64, metadata: &str) -> Self {
        self.certifications
            .lock()
            .unwrap()
            .entry(card_uid.to_string())
            .or_default()
            .push(id);
        self.metadata.lock().unwrap().insert(id, metadata.to_string());
        self
    }

    pub fn reverting(self) -> Self {
        *self.receipt.lock().unwrap() = ReceiptStatus::Reverted;
        self
    }

    pub fn without_oracle(self) -> Self {
        *self.oracle_registers.lock().unwrap() = false;
        self
    }

    pub fn rejecting_submissions(self, message: &str) -> Self {
        *self.submit_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ContractCall> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Option<ContractCall> {
        self.submitted.lock().unwrap().last().cloned()
    }

    fn register_from(&self, call: &ContractCall) {
        let (Some(card_uid), Some((student_id, _)), Some(image)) = (
            call.args.first().and_then(DynSolValue::as_str),
            call.args.get(1).and_then(DynSolValue::as_uint),
            call.args.get(2).and_then(DynSolValue::as_str),
        ) else {
            return;
        };
        let record = StudentRecord {
            student_id: student_id.to::<u64>(),
            image_reference: image.to_string(),
            wallet_address: tba(),
        };
        self.students
            .lock()
            .unwrap()
            .insert(card_uid.to_string(), record);
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    fn signer_address(&self) -> Address {
        signer()
    }

    async fn submit(&self, call: &ContractCall) -> BlockchainResult<TxHash> {
        if let Some(message) = self.submit_error.lock().unwrap().clone() {
            return Err(BlockchainError::Submission(message));
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(call.clone());
        Ok(TxHash::repeat_byte(submitted.len() as u8))
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> BlockchainResult<ReceiptStatus> {
        let status = *self.receipt.lock().unwrap();
        let index = tx_hash.0[0] as usize;
        let call = self.submitted.lock().unwrap().get(index - 1).cloned();
        if let Some(call) = call {
            if status.is_success()
                && call.method() == "registerStudentRequest"
                && *self.oracle_registers.lock().unwrap()
            {
                self.register_from(&call);
            }
        }
        Ok(status)
    }

    async fn student(&self, card_uid: &str) -> BlockchainResult<Option<StudentRecord>> {
        Ok(self.students.lock().unwrap().get(card_uid).cloned())
    }

    async fn admin(&self) -> BlockchainResult<Address> {
        Ok(signer())
    }

    async fn certifications(&self, card_uid: &str) -> BlockchainResult<Vec<u64>> {
        Ok(self
            .certifications
            .lock()
            .unwrap()
            .get(card_uid)
            .cloned()
            .unwrap_or_default())
    }

    async fn certification_metadata(&self, certification_id: u64) -> BlockchainResult<String> {
        self.metadata
            .lock()
            .unwrap()
            .get(&certification_id)
            .cloned()
            .ok_or_else(|| {
                BlockchainError::Decoding(format!("no certification {}", certification_id))
            })
    }

    async fn native_balance(&self, _address: Address) -> BlockchainResult<U256> {
        self.balance_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.native)
    }

    async fn token_balance(&self, _token: Address, _owner: Address) -> BlockchainResult<U256> {
        Ok(self.stable)
    }
}

/// Directory backed by a map of `(domain, label)` to address.
#[derive(Default)]
pub struct FakeNames {
    pub bindings: Mutex<HashMap<(String, String), String>>,
    pub claims: Mutex<Vec<(String, String, String)>>,
    pub fail_claims: bool,
}

impl FakeNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(self, domain: &str, label: &str, address: Address) -> Self {
        self.bindings.lock().unwrap().insert(
            (domain.to_string(), label.to_string()),
            address.to_checksum(None),
        );
        self
    }

    pub fn failing_claims(mut self) -> Self {
        self.fail_claims = true;
        self
    }

    pub fn claims(&self) -> Vec<(String, String, String)> {
        self.claims.lock().unwrap().clone()
    }
}

#[async_trait]
impl NameService for FakeNames {
    async fn search(&self, domain: &str, name: &str) -> Result<Vec<NameRecord>, NameError> {
        let bindings = self.bindings.lock().unwrap();
        Ok(bindings
            .get(&(domain.to_string(), name.to_string()))
            .map(|address| NameRecord {
                name: name.to_string(),
                domain: domain.to_string(),
                address: address.clone(),
            })
            .into_iter()
            .collect())
    }

    async fn names_for(&self, address: &str) -> Result<Vec<NameRecord>, NameError> {
        let bindings = self.bindings.lock().unwrap();
        Ok(bindings
            .iter()
            .filter(|(_, bound)| bound.eq_ignore_ascii_case(address))
            .map(|((domain, name), bound)| NameRecord {
                name: name.clone(),
                domain: domain.clone(),
                address: bound.clone(),
            })
            .collect())
    }

    async fn claim(&self, domain: &str, name: &str, address: &str) -> Result<(), NameError> {
        if self.fail_claims {
            return Err(NameError::Status {
                status: 409,
                body: "name taken".to_string(),
            });
        }
        self.claims
            .lock()
            .unwrap()
            .push((domain.to_string(), name.to_string(), address.to_string()));
        self.bindings
            .lock()
            .unwrap()
            .insert((domain.to_string(), name.to_string()), address.to_string());
        Ok(())
    }
}

/// Store that hands out `bafytest/<file name>`.
#[derive(Default)]
pub struct FakeStore {
    pub uploads: AtomicUsize,
    pub failing: bool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            uploads: AtomicUsize::new(0),
            failing: true,
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for FakeStore {
    async fn upload(&self, files: Vec<FilePayload>) -> Result<ContentRef, StorageError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(StorageError::Status {
                status: 500,
                body: "pinning unavailable".to_string(),
            });
        }
        let first = files.first().ok_or(StorageError::NoFiles)?;
        Ok(ContentRef {
            cid: "bafytest".to_string(),
            path: first.file_name.clone(),
        })
    }
}

pub struct FakeOracle(pub Option<f64>);

#[async_trait]
impl PriceOracle for FakeOracle {
    async fn eth_usd(&self) -> Result<f64, PriceError> {
        self.0.ok_or(PriceError::Missing("ethereum"))
    }
}

/// Collaborators plus the orchestrator wired to them.
pub struct Harness {
    pub ledger: Arc<FakeLedger>,
    pub names: Arc<FakeNames>,
    pub store: Arc<FakeStore>,
    pub orchestrator: Orchestrator,
}

pub fn harness(ledger: FakeLedger, names: FakeNames, store: FakeStore) -> Harness {
    let ledger = Arc::new(ledger);
    let names = Arc::new(names);
    let store = Arc::new(store);
    let services = Services {
        ledger: ledger.clone(),
        resolver: IdentityResolver::new(names.clone(), ".eth", "luca.eth"),
        storage: store.clone(),
        balances: BalanceCache::new(ledger.clone(), usdc()),
        rates: RateCache::new(Arc::new(FakeOracle(Some(2500.0)))),
    };
    Harness {
        orchestrator: Orchestrator::new(services, contracts()),
        ledger,
        names,
        store,
    }
}

pub fn default_harness() -> Harness {
    harness(FakeLedger::new(), FakeNames::new(), FakeStore::new())
}

/// Config accepted by validation, with admin routes on and a short oracle
/// wait.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.bind_address = "127.0.0.1:0".to_string();
    config.contracts.luca3auth = registry().to_checksum(None);
    config.contracts.treasury = treasury().to_checksum(None);
    config.contracts.usdc = usdc().to_checksum(None);
    config.registration.oracle_wait_secs = 1;
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    config.observability.metrics_enabled = false;
    config
}

/// Serve the app on an ephemeral port. Returns its base URL.
///
/// The server runs until the returned handle is triggered.
pub async fn start_server(
    config: AppConfig,
    orchestrator: Orchestrator,
) -> (String, Arc<Shutdown>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(Arc::new(config), orchestrator);
    let shutdown = Arc::new(Shutdown::new());
    let rx = shutdown.subscribe();
    let held = shutdown.clone();
    tokio::spawn(async move {
        let _held = held;
        let _ = server.run(listener, rx).await;
    });
    (format!("http://{}", addr), shutdown)
}

pub fn image() -> FilePayload {
    FilePayload::new("me.png", vec![0x89, b'P', b'N', b'G'])
}
