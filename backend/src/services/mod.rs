//! Business logic services for the Halal Marketplace

pub mod certification;
pub mod effects;
pub mod product;
pub mod supply_chain;

use std::sync::Arc;

use shared::{Actor, Capability};

use crate::error::{AppError, AppResult};
use crate::external::Adapters;
use crate::store::Store;

pub use certification::CertificationService;
pub use effects::BestEffort;
pub use product::ProductService;
pub use supply_chain::SupplyChainService;

/// Dependencies shared by every service
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn Store>,
    pub adapters: Adapters,
    pub effects: BestEffort,
    pub certificate_prefix: Arc<str>,
}

impl ServiceContext {
    pub fn new(store: Arc<dyn Store>, adapters: Adapters, certificate_prefix: &str) -> Self {
        Self {
            store,
            adapters,
            effects: BestEffort,
            certificate_prefix: Arc::from(certificate_prefix),
        }
    }
}

/// Role allow-list gate
pub fn authorize(actor: &Actor, capability: Capability) -> AppResult<()> {
    if actor.can(capability) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Role '{}' is not allowed to perform this action",
            actor.role
        )))
    }
}
