//! In-process store for local runs and tests

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared::{AccountContact, Certification, Pagination, Product, SupplyChainEvent};

use super::{
    AccountStore, CertificationFilter, CertificationStore, ProductFilter, ProductStore, Store,
    SupplyChainStore,
};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct Tables {
    products: HashMap<Uuid, Product>,
    certifications: HashMap<Uuid, Certification>,
    events: Vec<SupplyChainEvent>,
    accounts: HashMap<Uuid, AccountContact>,
}

/// Store backed by in-memory maps
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T: Clone>(mut items: Vec<T>, page: Pagination) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let items = if offset >= items.len() {
        Vec::new()
    } else {
        items
            .drain(offset..)
            .take(page.limit as usize)
            .collect()
    };
    (items, total)
}

fn duplicate(resource: &str, message: String) -> AppError {
    AppError::Conflict {
        resource: resource.to_string(),
        message,
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert_product(&self, product: &Product) -> AppResult<()> {
        self.tables
            .write()
            .await
            .products
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> AppResult<(Vec<Product>, u64)> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Product> = tables
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(matching, page))
    }

    async fn update_product(&self, product: &Product) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        match tables.products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Product".to_string())),
        }
    }

    async fn delete_product(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.products.remove(&id).is_some();
        if removed {
            tables.events.retain(|e| e.product_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl CertificationStore for MemoryStore {
    async fn insert_certification(&self, certification: &Certification) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .certifications
            .values()
            .any(|c| c.certificate_number == certification.certificate_number);
        if taken {
            return Err(duplicate(
                "certificate_number",
                format!(
                    "Certificate number {} is already in use",
                    certification.certificate_number
                ),
            ));
        }
        tables
            .certifications
            .insert(certification.id, certification.clone());
        Ok(())
    }

    async fn find_certification(&self, id: Uuid) -> AppResult<Option<Certification>> {
        Ok(self.tables.read().await.certifications.get(&id).cloned())
    }

    async fn find_certification_by_number(
        &self,
        number: &str,
    ) -> AppResult<Option<Certification>> {
        Ok(self
            .tables
            .read()
            .await
            .certifications
            .values()
            .find(|c| c.certificate_number == number)
            .cloned())
    }

    async fn list_certifications(
        &self,
        filter: &CertificationFilter,
        page: Pagination,
    ) -> AppResult<(Vec<Certification>, u64)> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Certification> = tables
            .certifications
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(matching, page))
    }

    async fn update_certification(&self, certification: &Certification) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        match tables.certifications.get_mut(&certification.id) {
            Some(existing) => {
                *existing = certification.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Certification".to_string())),
        }
    }

    async fn count_certifications_for_product(&self, product_id: Uuid) -> AppResult<u64> {
        Ok(self
            .tables
            .read()
            .await
            .certifications
            .values()
            .filter(|c| c.product_id == product_id)
            .count() as u64)
    }
}

#[async_trait]
impl SupplyChainStore for MemoryStore {
    async fn append_event(&self, event: &SupplyChainEvent) -> AppResult<()> {
        self.tables.write().await.events.push(event.clone());
        Ok(())
    }

    async fn list_events(&self, product_id: Uuid) -> AppResult<Vec<SupplyChainEvent>> {
        let tables = self.tables.read().await;
        let mut events: Vec<SupplyChainEvent> = tables
            .events
            .iter()
            .filter(|e| e.product_id == product_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(events)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_account(&self, id: Uuid) -> AppResult<Option<AccountContact>> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn insert_account(&self, account: &AccountContact) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .accounts
            .values()
            .any(|a| a.email.eq_ignore_ascii_case(&account.email));
        if taken {
            return Err(duplicate(
                "email",
                format!("An account with email {} already exists", account.email),
            ));
        }
        tables.accounts.insert(account.id, account.clone());
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
