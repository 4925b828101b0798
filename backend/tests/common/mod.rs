//! Shared fixtures: in-memory store plus fake external integrations

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use halal_marketplace_backend::external::{
    AdapterError, Adapters, ContentStore, DeliveryInfo, LanguageModel, LedgerClient,
    LedgerReceipt, LedgerRecord, LedgerVerification, Mailer,
};
use halal_marketplace_backend::services::{CertificationService, ProductService, SupplyChainService};
use halal_marketplace_backend::store::{AccountStore, MemoryStore, ProductStore};
use halal_marketplace_backend::ServiceContext;
use shared::{AccountContact, Actor, NewProduct, Product, Role, SupplyChainStage};

fn unavailable(service: &'static str) -> AdapterError {
    AdapterError::Transport {
        service,
        message: "connection refused".to_string(),
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// Ledger that accepts every call and remembers what it was asked
#[derive(Default)]
pub struct RecordingLedger {
    pub calls: Mutex<Vec<String>>,
}

impl RecordingLedger {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        calls.len()
    }
}

#[async_trait]
impl LedgerClient for RecordingLedger {
    async fn create_certification(
        &self,
        product_id: Uuid,
        vendor_address: &str,
        validity_period_secs: u64,
        _metadata_ref: Option<&str>,
    ) -> Result<LedgerRecord, AdapterError> {
        let n = self.record(format!(
            "create:{}:{}:{}",
            product_id, vendor_address, validity_period_secs
        ));
        Ok(LedgerRecord {
            tx_hash: format!("0xtx{}", n),
            block_number: n as u64,
            ledger_id: format!("cert-{}", n),
        })
    }

    async fn revoke_certification(&self, ledger_id: &str) -> Result<LedgerReceipt, AdapterError> {
        let n = self.record(format!("revoke:{}", ledger_id));
        Ok(LedgerReceipt {
            tx_hash: format!("0xtx{}", n),
            block_number: n as u64,
        })
    }

    async fn verify(&self, product_id: Uuid) -> Result<LedgerVerification, AdapterError> {
        self.record(format!("verify:{}", product_id));
        Ok(LedgerVerification {
            is_valid: true,
            ledger_id: Some("cert-1".to_string()),
            certifier_address: None,
            expires_at: Some(Utc::now() + Duration::days(30)),
        })
    }

    async fn register_product(
        &self,
        product_id: Uuid,
        _metadata_ref: Option<&str>,
    ) -> Result<LedgerRecord, AdapterError> {
        let n = self.record(format!("register:{}", product_id));
        Ok(LedgerRecord {
            tx_hash: format!("0xtx{}", n),
            block_number: n as u64,
            ledger_id: format!("product-{}", n),
        })
    }

    async fn record_supply_chain_event(
        &self,
        product_id: Uuid,
        stage: SupplyChainStage,
        _metadata_ref: Option<&str>,
    ) -> Result<LedgerReceipt, AdapterError> {
        let n = self.record(format!("event:{}:{}", product_id, stage));
        Ok(LedgerReceipt {
            tx_hash: format!("0xtx{}", n),
            block_number: n as u64,
        })
    }
}

/// Ledger whose every call fails
pub struct FailingLedger;

#[async_trait]
impl LedgerClient for FailingLedger {
    async fn create_certification(
        &self,
        _product_id: Uuid,
        _vendor_address: &str,
        _validity_period_secs: u64,
        _metadata_ref: Option<&str>,
    ) -> Result<LedgerRecord, AdapterError> {
        Err(unavailable("ledger"))
    }

    async fn revoke_certification(&self, _ledger_id: &str) -> Result<LedgerReceipt, AdapterError> {
        Err(unavailable("ledger"))
    }

    async fn verify(&self, _product_id: Uuid) -> Result<LedgerVerification, AdapterError> {
        Err(unavailable("ledger"))
    }

    async fn register_product(
        &self,
        _product_id: Uuid,
        _metadata_ref: Option<&str>,
    ) -> Result<LedgerRecord, AdapterError> {
        Err(unavailable("ledger"))
    }

    async fn record_supply_chain_event(
        &self,
        _product_id: Uuid,
        _stage: SupplyChainStage,
        _metadata_ref: Option<&str>,
    ) -> Result<LedgerReceipt, AdapterError> {
        Err(unavailable("ledger"))
    }
}

// ============================================================================
// Content storage, mail, language model
// ============================================================================

/// Content store keeping blobs in a map, ids are sequential
#[derive(Default)]
pub struct MemoryContent {
    pub blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryContent {
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentStore for MemoryContent {
    async fn put(&self, bytes: Vec<u8>) -> Result<String, AdapterError> {
        let mut blobs = self.blobs.lock().unwrap();
        let id = format!("bafy{}", blobs.len() + 1);
        blobs.insert(id.clone(), bytes);
        Ok(id)
    }

    async fn get(&self, content_id: &str) -> Result<Vec<u8>, AdapterError> {
        self.blobs
            .lock()
            .unwrap()
            .get(content_id)
            .cloned()
            .ok_or_else(|| unavailable("ipfs"))
    }

    fn url_for(&self, content_id: &str) -> Option<String> {
        Some(format!("memory://{}", content_id))
    }
}

/// Content store that is never reachable
pub struct FailingContent;

#[async_trait]
impl ContentStore for FailingContent {
    async fn put(&self, _bytes: Vec<u8>) -> Result<String, AdapterError> {
        Err(unavailable("ipfs"))
    }

    async fn get(&self, _content_id: &str) -> Result<Vec<u8>, AdapterError> {
        Err(unavailable("ipfs"))
    }

    fn url_for(&self, _content_id: &str) -> Option<String> {
        None
    }
}

/// Mailer that records `(to, subject)` pairs
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        _html_body: &str,
    ) -> Result<DeliveryInfo, AdapterError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Ok(DeliveryInfo { message_id: None })
    }
}

/// Mailer whose API always rejects the message
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(
        &self,
        _to: &str,
        _subject: &str,
        _html_body: &str,
    ) -> Result<DeliveryInfo, AdapterError> {
        Err(AdapterError::Rejected {
            service: "mail",
            status: 503,
            body: "service unavailable".to_string(),
        })
    }
}

/// Language model with a canned answer, or failing when `None`
pub struct CannedModel(pub Option<&'static str>);

#[async_trait]
impl LanguageModel for CannedModel {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, AdapterError> {
        match self.0 {
            Some(answer) => Ok(format!("{} [{}]", answer, prompt.lines().count())),
            None => Err(unavailable("llm")),
        }
    }
}

// ============================================================================
// Harness
// ============================================================================

pub const PREFIX: &str = "HALAL";

/// Services wired to an in-memory store and inspectable fakes
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub content: Arc<MemoryContent>,
    pub mailer: Arc<RecordingMailer>,
    pub ctx: ServiceContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_ledger(Arc::new(RecordingLedger::default()))
    }

    pub fn with_ledger(ledger: Arc<dyn LedgerClient>) -> Self {
        Self::build(ledger, CannedModel(Some("Likely compliant")))
    }

    pub fn build(ledger: Arc<dyn LedgerClient>, llm: CannedModel) -> Self {
        let store = Arc::new(MemoryStore::new());
        let content = Arc::new(MemoryContent::default());
        let mailer = Arc::new(RecordingMailer::default());
        let adapters = Adapters {
            ledger,
            content: content.clone(),
            mailer: mailer.clone(),
            llm: Arc::new(llm),
        };
        let ctx = ServiceContext::new(store.clone(), adapters, PREFIX);

        Self {
            store,
            content,
            mailer,
            ctx,
        }
    }

    /// Swap the content store, e.g. for [`FailingContent`]
    pub fn with_content(mut self, content: Arc<dyn ContentStore>) -> Self {
        self.ctx.adapters.content = content;
        self
    }

    /// Swap the mailer, e.g. for [`FailingMailer`]
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.ctx.adapters.mailer = mailer;
        self
    }

    pub fn certifications(&self) -> CertificationService {
        CertificationService::new(self.ctx.clone())
    }

    pub fn products(&self) -> ProductService {
        ProductService::new(self.ctx.clone())
    }

    pub fn supply_chain(&self) -> SupplyChainService {
        SupplyChainService::new(self.ctx.clone())
    }

    /// Register an account with contact details and return it as an actor
    pub async fn account(&self, role: Role, name: &str) -> Actor {
        let id = Uuid::new_v4();
        let contact = AccountContact {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            role,
            wallet_address: None,
        };
        self.store.insert_account(&contact).await.unwrap();
        Actor::new(id, role)
    }

    /// A product owned by `vendor`, inserted directly
    pub async fn product_for(&self, vendor: &Actor, name: &str) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: "Sample product".to_string(),
            category: shared::ProductCategory::Meat,
            vendor_id: vendor.id,
            price: Decimal::new(999, 2),
            is_available: true,
            is_featured: false,
            ledger_id: None,
            metadata_ref: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_product(&product).await.unwrap();
        product
    }
}

pub fn new_product(name: &str, category: &str, price: Decimal) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        description: "Slow-cooked and hand packed".to_string(),
        category: category.to_string(),
        price,
        is_available: None,
        is_featured: None,
    }
}

/// Expiry date `days` from now in the `YYYY-MM-DD` form clients send
pub fn expiry_in_days(days: i64) -> String {
    (Utc::now() + Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}
