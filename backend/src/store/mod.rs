//! Persistence layer
//!
//! Services talk to storage through these traits. [`PgStore`] is the
//! production backend; [`MemoryStore`] keeps everything in process for local
//! runs and tests.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use uuid::Uuid;

use shared::{
    AccountContact, Certification, CertificationStatus, Pagination, Product, ProductCategory,
    SupplyChainEvent,
};

use crate::error::AppResult;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Scope and filters for certification listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificationFilter {
    pub certifier_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub status: Option<CertificationStatus>,
}

impl CertificationFilter {
    pub fn matches(&self, c: &Certification) -> bool {
        self.certifier_id.map_or(true, |id| c.certifier_id == id)
            && self.vendor_id.map_or(true, |id| c.vendor_id == id)
            && self.product_id.map_or(true, |id| c.product_id == id)
            && self.status.map_or(true, |s| c.status == s)
    }
}

/// Filters for product listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<ProductCategory>,
    pub vendor_id: Option<Uuid>,
    pub featured: Option<bool>,
    pub available: Option<bool>,
}

impl ProductFilter {
    pub fn matches(&self, p: &Product) -> bool {
        self.category.map_or(true, |c| p.category == c)
            && self.vendor_id.map_or(true, |id| p.vendor_id == id)
            && self.featured.map_or(true, |f| p.is_featured == f)
            && self.available.map_or(true, |a| p.is_available == a)
    }
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> AppResult<()>;

    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>>;

    /// Newest first, with the total number of matches
    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> AppResult<(Vec<Product>, u64)>;

    async fn update_product(&self, product: &Product) -> AppResult<()>;

    /// Removes the product and its supply chain events. Returns false when absent.
    async fn delete_product(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait CertificationStore: Send + Sync {
    /// Fails with `Conflict` when the certificate number is taken
    async fn insert_certification(&self, certification: &Certification) -> AppResult<()>;

    async fn find_certification(&self, id: Uuid) -> AppResult<Option<Certification>>;

    async fn find_certification_by_number(&self, number: &str)
        -> AppResult<Option<Certification>>;

    /// Newest first, with the total number of matches
    async fn list_certifications(
        &self,
        filter: &CertificationFilter,
        page: Pagination,
    ) -> AppResult<(Vec<Certification>, u64)>;

    /// Writes every mutable field of an existing record
    async fn update_certification(&self, certification: &Certification) -> AppResult<()>;

    async fn count_certifications_for_product(&self, product_id: Uuid) -> AppResult<u64>;
}

#[async_trait]
pub trait SupplyChainStore: Send + Sync {
    async fn append_event(&self, event: &SupplyChainEvent) -> AppResult<()>;

    /// Ordered by `(occurred_at, created_at)` ascending
    async fn list_events(&self, product_id: Uuid) -> AppResult<Vec<SupplyChainEvent>>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account(&self, id: Uuid) -> AppResult<Option<AccountContact>>;

    /// Fails with `Conflict` when the email is taken
    async fn insert_account(&self, account: &AccountContact) -> AppResult<()>;
}

/// Everything the services need from persistence
#[async_trait]
pub trait Store: ProductStore + CertificationStore + SupplyChainStore + AccountStore {
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> AppResult<()>;
}
