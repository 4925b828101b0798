//! Certification workflow: issuance, status transitions and public verification

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use shared::{
    generate_certificate_number, AccountContact, Actor, Capability, Certification,
    CertificationMetadata, CertificationStatus, CertificationVerification, NewCertification, Page,
    Pagination, Role, StatusChange, DEFAULT_REVOCATION_REASON,
};

use super::{authorize, ServiceContext};
use crate::error::{AppError, AppResult};
use crate::external::{mail::certification_approved_email, put_json};
use crate::store::CertificationFilter;

/// Certification workflow service
#[derive(Clone)]
pub struct CertificationService {
    ctx: ServiceContext,
}

/// Filters and paging for certification listings
#[derive(Debug, Default, Deserialize)]
pub struct CertificationQuery {
    pub status: Option<String>,
    pub product_id: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl CertificationService {
    /// Create a new CertificationService instance
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    // ========================================================================
    // Issuance and reads
    // ========================================================================

    /// Create a pending certification for an existing product
    pub async fn create_certification(
        &self,
        actor: &Actor,
        input: NewCertification,
    ) -> AppResult<Certification> {
        authorize(actor, Capability::CreateCertification)?;

        let product = self
            .ctx
            .store
            .find_product(input.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let now = Utc::now();
        let expiry_date = shared::parse_date(&input.expiry_date)
            .map_err(|m| AppError::validation("expiry_date", m))?;
        shared::validate_future_date(expiry_date, now)
            .map_err(|m| AppError::validation("expiry_date", m))?;

        let certificate_number =
            generate_certificate_number(&self.ctx.certificate_prefix, now, &mut rand::thread_rng());

        let mut certification = Certification {
            id: Uuid::new_v4(),
            certificate_number,
            product_id: product.id,
            certifier_id: actor.id,
            vendor_id: product.vendor_id,
            status: CertificationStatus::Pending,
            issued_date: None,
            expiry_date,
            documents: input.documents,
            inspection_details: input.inspection_details,
            ledger_tx_hash: None,
            ledger_id: None,
            metadata_ref: None,
            revocation_reason: None,
            created_at: now,
            updated_at: now,
        };

        let metadata = CertificationMetadata::from(&certification);
        certification.metadata_ref = self
            .ctx
            .effects
            .run(
                "certification_metadata",
                certification.id,
                put_json(self.ctx.adapters.content.as_ref(), &metadata),
            )
            .await;

        self.ctx.store.insert_certification(&certification).await?;

        tracing::info!(
            certification_id = %certification.id,
            certificate_number = %certification.certificate_number,
            product_id = %certification.product_id,
            "Certification created"
        );

        Ok(certification)
    }

    /// List certifications visible to the caller, newest first
    pub async fn list_certifications(
        &self,
        actor: &Actor,
        query: CertificationQuery,
    ) -> AppResult<Page<Certification>> {
        authorize(actor, Capability::ListCertifications)?;

        let status = query
            .status
            .as_deref()
            .map(str::parse::<CertificationStatus>)
            .transpose()
            .map_err(|e| AppError::validation("status", e.to_string()))?;
        let page = Pagination::from_params(query.page, query.limit)
            .map_err(|m| AppError::validation("page", m))?;

        let mut filter = CertificationFilter {
            status,
            product_id: query.product_id,
            ..Default::default()
        };
        match actor.role {
            Role::Certifier => filter.certifier_id = Some(actor.id),
            Role::Vendor => filter.vendor_id = Some(actor.id),
            Role::Admin | Role::Customer => {}
        }

        let (items, total) = self.ctx.store.list_certifications(&filter, page).await?;

        Ok(Page {
            items,
            pagination: page.links(total),
        })
    }

    /// Get a certification the caller is entitled to see
    pub async fn get_certification(&self, actor: &Actor, id: Uuid) -> AppResult<Certification> {
        authorize(actor, Capability::ViewCertification)?;

        let certification = self.find(id).await?;
        if !can_view(actor, &certification) {
            return Err(AppError::forbidden(
                "Not authorized to access this certification",
            ));
        }

        Ok(certification)
    }

    /// Public lookup by certificate number
    pub async fn verify_certification(
        &self,
        certificate_number: &str,
    ) -> AppResult<CertificationVerification> {
        let certification = self
            .ctx
            .store
            .find_certification_by_number(certificate_number)
            .await?
            .ok_or_else(|| AppError::NotFound("Certification".to_string()))?;

        let now = Utc::now();
        Ok(CertificationVerification {
            is_expired: certification.is_expired_at(now),
            is_valid: certification.is_valid_at(now),
            certification,
        })
    }

    // ========================================================================
    // Status transitions
    // ========================================================================

    /// Move a certification to a new status, firing best-effort side effects
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: Uuid,
        change: StatusChange,
    ) -> AppResult<Certification> {
        let new_status: CertificationStatus = change
            .status
            .parse()
            .map_err(|e: shared::ParseEnumError| AppError::validation("status", e.to_string()))?;

        authorize(actor, Capability::UpdateCertificationStatus)?;

        let mut certification = self.find(id).await?;
        if !actor.is_admin() && certification.certifier_id != actor.id {
            return Err(AppError::forbidden(
                "Only the issuing certifier or an admin can change this certification",
            ));
        }

        let now = Utc::now();
        let previous = certification.status;

        match new_status {
            CertificationStatus::Approved if previous != CertificationStatus::Approved => {
                certification.issued_date = Some(now);
                self.record_on_ledger(&mut certification, now).await;
                self.notify_approval(&certification).await;
            }
            CertificationStatus::Revoked => {
                let reason = change
                    .revocation_reason
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| DEFAULT_REVOCATION_REASON.to_string());
                certification.revocation_reason = Some(reason);

                if let Some(ledger_id) = certification.ledger_id.clone() {
                    self.ctx
                        .effects
                        .run(
                            "ledger_revoke",
                            certification.id,
                            self.ctx.adapters.ledger.revoke_certification(&ledger_id),
                        )
                        .await;
                }
            }
            _ => {}
        }

        certification.status = new_status;
        certification.updated_at = now;
        self.ctx.store.update_certification(&certification).await?;

        tracing::info!(
            certification_id = %certification.id,
            from = %previous,
            to = %new_status,
            actor = %actor.id,
            "Certification status updated"
        );

        Ok(certification)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn find(&self, id: Uuid) -> AppResult<Certification> {
        self.ctx
            .store
            .find_certification(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Certification".to_string()))
    }

    /// Account lookup for side effects; errors only degrade the effect
    async fn contact(&self, account_id: Uuid) -> Option<AccountContact> {
        match self.ctx.store.find_account(account_id).await {
            Ok(contact) => contact,
            Err(e) => {
                tracing::warn!(%account_id, error = %e, "Account lookup failed");
                None
            }
        }
    }

    async fn record_on_ledger(&self, certification: &mut Certification, now: DateTime<Utc>) {
        let vendor_address = self
            .contact(certification.vendor_id)
            .await
            .and_then(|c| c.wallet_address)
            .unwrap_or_else(|| certification.vendor_id.to_string());
        let validity_secs = validity_period_secs(certification.expiry_date, now);

        let record = self
            .ctx
            .effects
            .run(
                "ledger_create",
                certification.id,
                self.ctx.adapters.ledger.create_certification(
                    certification.product_id,
                    &vendor_address,
                    validity_secs,
                    certification.metadata_ref.as_deref(),
                ),
            )
            .await;

        if let Some(record) = record {
            certification.ledger_id = Some(record.ledger_id);
            certification.ledger_tx_hash = Some(record.tx_hash);
        }
    }

    async fn notify_approval(&self, certification: &Certification) {
        let Some(vendor) = self.contact(certification.vendor_id).await else {
            tracing::warn!(
                certification_id = %certification.id,
                vendor_id = %certification.vendor_id,
                "No vendor contact, approval email skipped"
            );
            return;
        };

        let product_name = match self.ctx.store.find_product(certification.product_id).await {
            Ok(Some(product)) => product.name,
            _ => "your product".to_string(),
        };

        let (subject, body) = certification_approved_email(
            &vendor.name,
            &product_name,
            &certification.certificate_number,
            certification.expiry_date,
        );

        self.ctx
            .effects
            .run(
                "approval_email",
                certification.id,
                self.ctx.adapters.mailer.send(&vendor.email, &subject, &body),
            )
            .await;
    }
}

/// Admin, the issuing certifier or the owning vendor
pub fn can_view(actor: &Actor, certification: &Certification) -> bool {
    actor.is_admin() || certification.certifier_id == actor.id || certification.vendor_id == actor.id
}

/// Seconds from `now` until expiry, floored at zero
pub fn validity_period_secs(expiry: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((expiry - now).num_seconds()).unwrap_or(0)
}
