//! Product catalogue service

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use shared::{
    Actor, Capability, NewProduct, Page, Pagination, Product, ProductAssessment, ProductCategory,
    ProductMetadata, ProductUpdate, Role,
};

use super::{authorize, ServiceContext};
use crate::error::{AppError, AppResult};
use crate::external::{put_json, LedgerVerification};
use crate::store::ProductFilter;

const ASSESSMENT_SYSTEM_PROMPT: &str = "You are a halal compliance auditor. Assess the product \
described by the user against common halal certification requirements. List likely concerns \
about ingredients, processing and cross-contamination, then give an overall recommendation.";

/// Product catalogue service
#[derive(Clone)]
pub struct ProductService {
    ctx: ServiceContext,
}

/// Filters and paging for product listings
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub vendor_id: Option<Uuid>,
    pub featured: Option<bool>,
    pub available: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// List a new product for the calling vendor
    pub async fn create_product(&self, actor: &Actor, input: NewProduct) -> AppResult<Product> {
        if actor.role != Role::Vendor {
            return Err(AppError::forbidden("Only vendors can list products"));
        }

        let name = input.name.trim().to_string();
        shared::validate_product_name(&name).map_err(|m| AppError::validation("name", m))?;
        shared::validate_price(input.price).map_err(|m| AppError::validation("price", m))?;
        let category = parse_category(&input.category)?;

        let now = Utc::now();
        let mut product = Product {
            id: Uuid::new_v4(),
            name,
            description: input.description,
            category,
            vendor_id: actor.id,
            price: input.price,
            is_available: input.is_available.unwrap_or(true),
            is_featured: input.is_featured.unwrap_or(false),
            ledger_id: None,
            metadata_ref: None,
            created_at: now,
            updated_at: now,
        };

        product.metadata_ref = self.push_metadata(&product).await;

        let record = self
            .ctx
            .effects
            .run(
                "ledger_register_product",
                product.id,
                self.ctx
                    .adapters
                    .ledger
                    .register_product(product.id, product.metadata_ref.as_deref()),
            )
            .await;
        product.ledger_id = record.map(|r| r.ledger_id);

        self.ctx.store.insert_product(&product).await?;

        tracing::info!(product_id = %product.id, vendor_id = %product.vendor_id, "Product created");

        Ok(product)
    }

    pub async fn get_product(&self, id: Uuid) -> AppResult<Product> {
        self.ctx
            .store
            .find_product(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Public listing, newest first
    pub async fn list_products(&self, query: ProductQuery) -> AppResult<Page<Product>> {
        let category = query.category.as_deref().map(parse_category).transpose()?;
        let page = Pagination::from_params(query.page, query.limit)
            .map_err(|m| AppError::validation("page", m))?;

        let filter = ProductFilter {
            category,
            vendor_id: query.vendor_id,
            featured: query.featured,
            available: query.available,
        };
        let (items, total) = self.ctx.store.list_products(&filter, page).await?;

        Ok(Page {
            items,
            pagination: page.links(total),
        })
    }

    /// Partial update by the owning vendor or an admin
    pub async fn update_product(
        &self,
        actor: &Actor,
        id: Uuid,
        input: ProductUpdate,
    ) -> AppResult<Product> {
        let mut product = self.owned_product(actor, id).await?;
        let mut metadata_changed = false;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            shared::validate_product_name(&name).map_err(|m| AppError::validation("name", m))?;
            metadata_changed |= name != product.name;
            product.name = name;
        }
        if let Some(description) = input.description {
            metadata_changed |= description != product.description;
            product.description = description;
        }
        if let Some(category) = input.category {
            let category = parse_category(&category)?;
            metadata_changed |= category != product.category;
            product.category = category;
        }
        if let Some(price) = input.price {
            shared::validate_price(price).map_err(|m| AppError::validation("price", m))?;
            product.price = price;
        }
        if let Some(available) = input.is_available {
            product.is_available = available;
        }
        if let Some(featured) = input.is_featured {
            product.is_featured = featured;
        }

        product.updated_at = Utc::now();

        if metadata_changed {
            if let Some(metadata_ref) = self.push_metadata(&product).await {
                product.metadata_ref = Some(metadata_ref);
            }
        }

        self.ctx.store.update_product(&product).await?;

        tracing::info!(product_id = %product.id, metadata_changed, "Product updated");

        Ok(product)
    }

    /// Delete by the owning vendor or an admin; refused while certifications exist
    pub async fn delete_product(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        let product = self.owned_product(actor, id).await?;

        let certifications = self
            .ctx
            .store
            .count_certifications_for_product(product.id)
            .await?;
        if certifications > 0 {
            return Err(AppError::Conflict {
                resource: "Product".to_string(),
                message: format!(
                    "Product has {} certification(s) and cannot be deleted",
                    certifications
                ),
            });
        }

        if !self.ctx.store.delete_product(product.id).await? {
            return Err(AppError::NotFound("Product".to_string()));
        }

        tracing::info!(product_id = %product.id, actor = %actor.id, "Product deleted");
        Ok(())
    }

    /// Ask the language model for a halal-compliance assessment
    pub async fn assess_product(&self, actor: &Actor, id: Uuid) -> AppResult<ProductAssessment> {
        authorize(actor, Capability::RequestAssessment)?;

        let product = self.get_product(id).await?;
        if actor.role == Role::Vendor && product.vendor_id != actor.id {
            return Err(AppError::forbidden(
                "Vendors can only request assessments for their own products",
            ));
        }

        let prompt = assessment_prompt(&product);
        let assessment = self
            .ctx
            .adapters
            .llm
            .complete(ASSESSMENT_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| {
                tracing::error!(product_id = %product.id, error = %e, "Assessment failed");
                AppError::Internal("Assessment service unavailable".to_string())
            })?;

        Ok(ProductAssessment {
            product_id: product.id,
            assessment,
            generated_at: Utc::now(),
        })
    }

    /// Ledger cross-check; `None` when the ledger cannot answer
    pub async fn ledger_status(&self, id: Uuid) -> AppResult<Option<LedgerVerification>> {
        let product = self.get_product(id).await?;

        Ok(self
            .ctx
            .effects
            .run(
                "ledger_verify",
                product.id,
                self.ctx.adapters.ledger.verify(product.id),
            )
            .await)
    }

    async fn owned_product(&self, actor: &Actor, id: Uuid) -> AppResult<Product> {
        authorize(actor, Capability::ManageProducts)?;

        let product = self.get_product(id).await?;
        if !actor.is_admin() && product.vendor_id != actor.id {
            return Err(AppError::forbidden("Not authorized to modify this product"));
        }
        Ok(product)
    }

    async fn push_metadata(&self, product: &Product) -> Option<String> {
        let metadata = ProductMetadata::from(product);
        self.ctx
            .effects
            .run(
                "product_metadata",
                product.id,
                put_json(self.ctx.adapters.content.as_ref(), &metadata),
            )
            .await
    }
}

fn parse_category(value: &str) -> AppResult<ProductCategory> {
    value
        .parse()
        .map_err(|e: shared::ParseEnumError| AppError::validation("category", e.to_string()))
}

fn assessment_prompt(product: &Product) -> String {
    let description = if product.description.trim().is_empty() {
        "(no description provided)"
    } else {
        product.description.as_str()
    };

    format!(
        "Product: {}\nCategory: {}\nDescription: {}",
        product.name,
        product.category.display_name(),
        description
    )
}
