//! PostgreSQL store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use shared::{
    AccountContact, Certification, CertificationDocument, GeoPoint, InspectionDetails, Pagination,
    Product, SensorReadings, SupplyChainEvent,
};

use super::{
    AccountStore, CertificationFilter, CertificationStore, ProductFilter, ProductStore, Store,
    SupplyChainStore,
};
use crate::error::{AppError, AppResult};

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

/// Map a unique-index violation to `Conflict`, everything else as [`write_error`]
fn unique_to_conflict(err: sqlx::Error, resource: &str, message: String) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::Conflict {
            resource: resource.to_string(),
            message,
        },
        _ => write_error(err),
    }
}

/// Foreign-key violations on writes
///
/// Accounts are mirrored from the identity service; a token for an account
/// that was never mirrored fails the `accounts` reference. A product deleted
/// between lookup and insert fails the `product_id` reference.
fn write_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            match db_err.constraint() {
                Some(constraint) if constraint.ends_with("product_id_fkey") => {
                    AppError::NotFound("Product".to_string())
                }
                constraint => {
                    tracing::warn!(?constraint, "Write references an unregistered account");
                    AppError::forbidden("Account is not registered with the marketplace")
                }
            }
        }
        _ => AppError::DatabaseError(err),
    }
}

fn corrupt(column: &str, err: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("Stored {} is invalid: {}", column, err))
}

fn limit_offset(page: Pagination) -> (i64, i64) {
    (
        i64::from(page.limit),
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    )
}

// ============================================================================
// Row types
// ============================================================================

const PRODUCT_COLUMNS: &str = "id, name, description, category, vendor_id, price, is_available, \
     is_featured, ledger_id, metadata_ref, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    category: String,
    vendor_id: Uuid,
    price: Decimal,
    is_available: bool,
    is_featured: bool,
    ledger_id: Option<String>,
    metadata_ref: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = AppError;

    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: r.id,
            name: r.name,
            description: r.description,
            category: r.category.parse().map_err(|e| corrupt("category", e))?,
            vendor_id: r.vendor_id,
            price: r.price,
            is_available: r.is_available,
            is_featured: r.is_featured,
            ledger_id: r.ledger_id,
            metadata_ref: r.metadata_ref,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const CERTIFICATION_COLUMNS: &str = "id, certificate_number, product_id, certifier_id, vendor_id, \
     status, issued_date, expiry_date, documents, inspection_details, ledger_tx_hash, ledger_id, \
     metadata_ref, revocation_reason, created_at, updated_at";

#[derive(Debug, FromRow)]
struct CertificationRow {
    id: Uuid,
    certificate_number: String,
    product_id: Uuid,
    certifier_id: Uuid,
    vendor_id: Uuid,
    status: String,
    issued_date: Option<DateTime<Utc>>,
    expiry_date: DateTime<Utc>,
    documents: Json<Vec<CertificationDocument>>,
    inspection_details: Json<InspectionDetails>,
    ledger_tx_hash: Option<String>,
    ledger_id: Option<String>,
    metadata_ref: Option<String>,
    revocation_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CertificationRow> for Certification {
    type Error = AppError;

    fn try_from(r: CertificationRow) -> Result<Self, Self::Error> {
        Ok(Certification {
            id: r.id,
            certificate_number: r.certificate_number,
            product_id: r.product_id,
            certifier_id: r.certifier_id,
            vendor_id: r.vendor_id,
            status: r.status.parse().map_err(|e| corrupt("status", e))?,
            issued_date: r.issued_date,
            expiry_date: r.expiry_date,
            documents: r.documents.0,
            inspection_details: r.inspection_details.0,
            ledger_tx_hash: r.ledger_tx_hash,
            ledger_id: r.ledger_id,
            metadata_ref: r.metadata_ref,
            revocation_reason: r.revocation_reason,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const EVENT_COLUMNS: &str = "id, product_id, stage, actor_id, latitude, longitude, address, \
     occurred_at, description, attachments, sensor_readings, extra, ledger_tx_hash, metadata_ref, \
     created_at";

#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    product_id: Uuid,
    stage: String,
    actor_id: Uuid,
    latitude: Decimal,
    longitude: Decimal,
    address: Option<String>,
    occurred_at: DateTime<Utc>,
    description: String,
    attachments: Vec<String>,
    sensor_readings: Option<Json<SensorReadings>>,
    extra: Option<serde_json::Value>,
    ledger_tx_hash: Option<String>,
    metadata_ref: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for SupplyChainEvent {
    type Error = AppError;

    fn try_from(r: EventRow) -> Result<Self, Self::Error> {
        Ok(SupplyChainEvent {
            id: r.id,
            product_id: r.product_id,
            stage: r.stage.parse().map_err(|e| corrupt("stage", e))?,
            actor_id: r.actor_id,
            location: GeoPoint {
                latitude: r.latitude,
                longitude: r.longitude,
                address: r.address,
            },
            occurred_at: r.occurred_at,
            description: r.description,
            attachments: r.attachments,
            sensor_readings: r.sensor_readings.map(|j| j.0),
            extra: r.extra,
            ledger_tx_hash: r.ledger_tx_hash,
            metadata_ref: r.metadata_ref,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    wallet_address: Option<String>,
}

impl TryFrom<AccountRow> for AccountContact {
    type Error = AppError;

    fn try_from(r: AccountRow) -> Result<Self, Self::Error> {
        Ok(AccountContact {
            id: r.id,
            name: r.name,
            email: r.email,
            role: r.role.parse().map_err(|e| corrupt("role", e))?,
            wallet_address: r.wallet_address,
        })
    }
}

// ============================================================================
// Products
// ============================================================================

#[async_trait]
impl ProductStore for PgStore {
    async fn insert_product(&self, p: &Product) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, category, vendor_id, price, is_available,
                is_featured, ledger_id, metadata_ref, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(p.id)
        .bind(&p.name)
        .bind(&p.description)
        .bind(p.category.as_str())
        .bind(p.vendor_id)
        .bind(p.price)
        .bind(p.is_available)
        .bind(p.is_featured)
        .bind(&p.ledger_id)
        .bind(&p.metadata_ref)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(&self.db)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> AppResult<(Vec<Product>, u64)> {
        const WHERE: &str = "WHERE ($1::text IS NULL OR category = $1)
              AND ($2::uuid IS NULL OR vendor_id = $2)
              AND ($3::bool IS NULL OR is_featured = $3)
              AND ($4::bool IS NULL OR is_available = $4)";

        let category = filter.category.map(|c| c.as_str());
        let (limit, offset) = limit_offset(page);

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products {} ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6",
            PRODUCT_COLUMNS, WHERE
        ))
        .bind(category)
        .bind(filter.vendor_id)
        .bind(filter.featured)
        .bind(filter.available)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM products {}", WHERE))
            .bind(category)
            .bind(filter.vendor_id)
            .bind(filter.featured)
            .bind(filter.available)
            .fetch_one(&self.db)
            .await?;

        let products = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((products, total.max(0) as u64))
    }

    async fn update_product(&self, p: &Product) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = $2,
                description = $3,
                category = $4,
                price = $5,
                is_available = $6,
                is_featured = $7,
                ledger_id = $8,
                metadata_ref = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(p.id)
        .bind(&p.name)
        .bind(&p.description)
        .bind(p.category.as_str())
        .bind(p.price)
        .bind(p.is_available)
        .bind(p.is_featured)
        .bind(&p.ledger_id)
        .bind(&p.metadata_ref)
        .bind(p.updated_at)
        .execute(&self.db)
        .await
        .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }
        Ok(())
    }

    async fn delete_product(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM supply_chain_events WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Certifications
// ============================================================================

#[async_trait]
impl CertificationStore for PgStore {
    async fn insert_certification(&self, c: &Certification) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO certifications (
                id, certificate_number, product_id, certifier_id, vendor_id, status,
                issued_date, expiry_date, documents, inspection_details, ledger_tx_hash,
                ledger_id, metadata_ref, revocation_reason, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(c.id)
        .bind(&c.certificate_number)
        .bind(c.product_id)
        .bind(c.certifier_id)
        .bind(c.vendor_id)
        .bind(c.status.as_str())
        .bind(c.issued_date)
        .bind(c.expiry_date)
        .bind(Json(&c.documents))
        .bind(Json(&c.inspection_details))
        .bind(&c.ledger_tx_hash)
        .bind(&c.ledger_id)
        .bind(&c.metadata_ref)
        .bind(&c.revocation_reason)
        .bind(c.created_at)
        .bind(c.updated_at)
        .execute(&self.db)
        .await
        .map_err(|e| {
            unique_to_conflict(
                e,
                "certificate_number",
                format!("Certificate number {} is already in use", c.certificate_number),
            )
        })?;

        Ok(())
    }

    async fn find_certification(&self, id: Uuid) -> AppResult<Option<Certification>> {
        let row = sqlx::query_as::<_, CertificationRow>(&format!(
            "SELECT {} FROM certifications WHERE id = $1",
            CERTIFICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Certification::try_from).transpose()
    }

    async fn find_certification_by_number(
        &self,
        number: &str,
    ) -> AppResult<Option<Certification>> {
        let row = sqlx::query_as::<_, CertificationRow>(&format!(
            "SELECT {} FROM certifications WHERE certificate_number = $1",
            CERTIFICATION_COLUMNS
        ))
        .bind(number)
        .fetch_optional(&self.db)
        .await?;

        row.map(Certification::try_from).transpose()
    }

    async fn list_certifications(
        &self,
        filter: &CertificationFilter,
        page: Pagination,
    ) -> AppResult<(Vec<Certification>, u64)> {
        const WHERE: &str = "WHERE ($1::uuid IS NULL OR certifier_id = $1)
              AND ($2::uuid IS NULL OR vendor_id = $2)
              AND ($3::uuid IS NULL OR product_id = $3)
              AND ($4::text IS NULL OR status = $4)";

        let status = filter.status.map(|s| s.as_str());
        let (limit, offset) = limit_offset(page);

        let rows = sqlx::query_as::<_, CertificationRow>(&format!(
            "SELECT {} FROM certifications {} ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6",
            CERTIFICATION_COLUMNS, WHERE
        ))
        .bind(filter.certifier_id)
        .bind(filter.vendor_id)
        .bind(filter.product_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM certifications {}", WHERE))
                .bind(filter.certifier_id)
                .bind(filter.vendor_id)
                .bind(filter.product_id)
                .bind(status)
                .fetch_one(&self.db)
                .await?;

        let certifications = rows
            .into_iter()
            .map(Certification::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((certifications, total.max(0) as u64))
    }

    async fn update_certification(&self, c: &Certification) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE certifications SET
                status = $2,
                issued_date = $3,
                expiry_date = $4,
                documents = $5,
                inspection_details = $6,
                ledger_tx_hash = $7,
                ledger_id = $8,
                metadata_ref = $9,
                revocation_reason = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(c.id)
        .bind(c.status.as_str())
        .bind(c.issued_date)
        .bind(c.expiry_date)
        .bind(Json(&c.documents))
        .bind(Json(&c.inspection_details))
        .bind(&c.ledger_tx_hash)
        .bind(&c.ledger_id)
        .bind(&c.metadata_ref)
        .bind(&c.revocation_reason)
        .bind(c.updated_at)
        .execute(&self.db)
        .await
        .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Certification".to_string()));
        }
        Ok(())
    }

    async fn count_certifications_for_product(&self, product_id: Uuid) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM certifications WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count.max(0) as u64)
    }
}

// ============================================================================
// Supply chain events
// ============================================================================

#[async_trait]
impl SupplyChainStore for PgStore {
    async fn append_event(&self, e: &SupplyChainEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO supply_chain_events (
                id, product_id, stage, actor_id, latitude, longitude, address,
                occurred_at, description, attachments, sensor_readings, extra,
                ledger_tx_hash, metadata_ref, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(e.id)
        .bind(e.product_id)
        .bind(e.stage.as_str())
        .bind(e.actor_id)
        .bind(e.location.latitude)
        .bind(e.location.longitude)
        .bind(&e.location.address)
        .bind(e.occurred_at)
        .bind(&e.description)
        .bind(&e.attachments)
        .bind(e.sensor_readings.as_ref().map(Json))
        .bind(&e.extra)
        .bind(&e.ledger_tx_hash)
        .bind(&e.metadata_ref)
        .bind(e.created_at)
        .execute(&self.db)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn list_events(&self, product_id: Uuid) -> AppResult<Vec<SupplyChainEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM supply_chain_events WHERE product_id = $1 \
             ORDER BY occurred_at ASC, created_at ASC",
            EVENT_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(SupplyChainEvent::try_from).collect()
    }
}

// ============================================================================
// Accounts
// ============================================================================

#[async_trait]
impl AccountStore for PgStore {
    async fn find_account(&self, id: Uuid) -> AppResult<Option<AccountContact>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, name, email, role, wallet_address FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(AccountContact::try_from).transpose()
    }

    async fn insert_account(&self, a: &AccountContact) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO accounts (id, name, email, role, wallet_address) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(a.id)
        .bind(&a.name)
        .bind(&a.email)
        .bind(a.role.as_str())
        .bind(&a.wallet_address)
        .execute(&self.db)
        .await
        .map_err(|e| {
            unique_to_conflict(
                e,
                "email",
                format!("An account with email {} already exists", a.email),
            )
        })?;

        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;

    #[derive(Debug)]
    struct Violation {
        kind: ErrorKind,
        constraint: &'static str,
    }

    impl std::fmt::Display for Violation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "violates constraint {}", self.constraint)
        }
    }

    impl std::error::Error for Violation {}

    impl DatabaseError for Violation {
        fn message(&self) -> &str {
            "constraint violation"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            None
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.constraint)
        }

        fn kind(&self) -> ErrorKind {
            match self.kind {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn violation(kind: ErrorKind, constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(Violation { kind, constraint }))
    }

    #[test]
    fn unregistered_account_is_forbidden_not_a_server_error() {
        for constraint in [
            "products_vendor_id_fkey",
            "certifications_certifier_id_fkey",
            "supply_chain_events_actor_id_fkey",
        ] {
            let err = write_error(violation(ErrorKind::ForeignKeyViolation, constraint));
            assert!(matches!(err, AppError::Forbidden(_)), "{}: {:?}", constraint, err);
        }
    }

    #[test]
    fn vanished_product_is_not_found() {
        let err = write_error(violation(
            ErrorKind::ForeignKeyViolation,
            "supply_chain_events_product_id_fkey",
        ));
        assert!(matches!(err, AppError::NotFound(ref r) if r == "Product"));
    }

    #[test]
    fn certification_insert_maps_both_violation_kinds() {
        let err = unique_to_conflict(
            violation(ErrorKind::UniqueViolation, "certifications_certificate_number_key"),
            "certificate_number",
            "taken".to_string(),
        );
        assert!(matches!(err, AppError::Conflict { ref resource, .. } if resource == "certificate_number"));

        let err = unique_to_conflict(
            violation(ErrorKind::ForeignKeyViolation, "certifications_vendor_id_fkey"),
            "certificate_number",
            "taken".to_string(),
        );
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = write_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::DatabaseError(_)));
    }
}
