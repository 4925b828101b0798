//! Certification workflow tests
//!
//! Covers issuance, status transitions, verification, role gates and
//! resilience to ledger failures.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use common::{
    expiry_in_days, FailingContent, FailingLedger, FailingMailer, Harness, RecordingLedger, PREFIX,
};
use halal_marketplace_backend::services::certification::CertificationQuery;
use halal_marketplace_backend::store::CertificationStore;
use halal_marketplace_backend::AppError;
use shared::{
    is_certificate_number, CertificationStatus, InspectionDetails, NewCertification, Role,
    StatusChange, DEFAULT_REVOCATION_REASON,
};

fn new_certification(product_id: Uuid, expiry_date: String) -> NewCertification {
    NewCertification {
        product_id,
        expiry_date,
        documents: Vec::new(),
        inspection_details: InspectionDetails {
            inspector_name: Some("Aisha Rahman".to_string()),
            ..Default::default()
        },
    }
}

fn status(value: &str) -> StatusChange {
    StatusChange {
        status: value.to_string(),
        revocation_reason: None,
    }
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn test_create_certification_is_pending_with_formatted_number() {
    let h = Harness::new();
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Lamb Kofta").await;

    let cert = h
        .certifications()
        .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
        .await
        .unwrap();

    assert_eq!(cert.status, CertificationStatus::Pending);
    assert!(is_certificate_number(PREFIX, &cert.certificate_number));
    assert_eq!(cert.vendor_id, vendor.id);
    assert_eq!(cert.certifier_id, certifier.id);
    assert!(cert.issued_date.is_none());
    assert!(cert.metadata_ref.is_some());
    assert_eq!(h.content.len(), 1);
}

#[tokio::test]
async fn test_certificate_numbers_are_unique() {
    let h = Harness::new();
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Chicken Satay").await;

    let mut numbers = Vec::new();
    for _ in 0..5 {
        let cert = h
            .certifications()
            .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
            .await
            .unwrap();
        numbers.push(cert.certificate_number);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let mut deduped = numbers.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), numbers.len());
}

#[tokio::test]
async fn test_content_store_failure_still_persists_certification() {
    let h = Harness::new().with_content(Arc::new(FailingContent));
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Hummus").await;

    let cert = h
        .certifications()
        .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
        .await
        .unwrap();

    assert_eq!(cert.status, CertificationStatus::Pending);
    assert!(cert.metadata_ref.is_none());

    let stored = h.store.find_certification(cert.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CertificationStatus::Pending);
    assert!(stored.metadata_ref.is_none());
    assert_eq!(stored.certificate_number, cert.certificate_number);
}

#[tokio::test]
async fn test_duplicate_certificate_number_is_a_conflict() {
    let h = Harness::new();
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Labneh").await;

    let cert = h
        .certifications()
        .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
        .await
        .unwrap();

    let mut clash = cert.clone();
    clash.id = Uuid::new_v4();
    let err = h.store.insert_certification(&clash).await.unwrap_err();
    assert!(
        matches!(err, AppError::Conflict { ref resource, .. } if resource == "certificate_number"),
        "unexpected error: {:?}",
        err
    );
    assert!(h.store.find_certification(clash.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_requires_existing_product() {
    let h = Harness::new();
    let certifier = h.account(Role::Certifier, "Certifier One").await;

    let err = h
        .certifications()
        .create_certification(&certifier, new_certification(Uuid::new_v4(), expiry_in_days(30)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_create_rejects_past_or_malformed_expiry() {
    let h = Harness::new();
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Beef Jerky").await;
    let service = h.certifications();

    for expiry in [expiry_in_days(-1), "next tuesday".to_string()] {
        let err = service
            .create_certification(&certifier, new_certification(product.id, expiry))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Validation { ref field, .. } if field == "expiry_date"),
            "unexpected error: {:?}",
            err
        );
    }
}

#[tokio::test]
async fn test_only_certifiers_and_admins_create() {
    let h = Harness::new();
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let customer = h.account(Role::Customer, "Customer One").await;
    let product = h.product_for(&vendor, "Dates").await;

    for actor in [vendor, customer] {
        let err = h
            .certifications()
            .create_certification(&actor, new_certification(product.id, expiry_in_days(30)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}

// ============================================================================
// Status transitions
// ============================================================================

#[tokio::test]
async fn test_approval_sets_issued_date_ledger_fields_and_emails_vendor() {
    let ledger = Arc::new(RecordingLedger::default());
    let h = Harness::with_ledger(ledger.clone());
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Halal Sausages").await;
    let service = h.certifications();

    let cert = service
        .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
        .await
        .unwrap();
    let approved = service
        .update_status(&certifier, cert.id, status("approved"))
        .await
        .unwrap();

    assert_eq!(approved.status, CertificationStatus::Approved);
    assert!(approved.issued_date.is_some());
    assert_eq!(approved.ledger_id.as_deref(), Some("cert-1"));
    assert!(approved.ledger_tx_hash.is_some());

    let calls = ledger.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with(&format!("create:{}:{}:", product.id, vendor.id)));

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "vendor.one@example.com");
    assert!(sent[0].1.contains("Halal Sausages"));

    let stored = h.store.find_certification(cert.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CertificationStatus::Approved);
    assert_eq!(stored.ledger_id, approved.ledger_id);
}

#[tokio::test]
async fn test_repeat_approval_keeps_issued_date_and_skips_side_effects() {
    let ledger = Arc::new(RecordingLedger::default());
    let h = Harness::with_ledger(ledger.clone());
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Lentil Soup").await;
    let service = h.certifications();

    let cert = service
        .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
        .await
        .unwrap();
    let first = service
        .update_status(&certifier, cert.id, status("approved"))
        .await
        .unwrap();
    let second = service
        .update_status(&certifier, cert.id, status("approved"))
        .await
        .unwrap();

    assert_eq!(second.status, CertificationStatus::Approved);
    assert_eq!(second.issued_date, first.issued_date);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(ledger.calls().len(), 1);
    assert_eq!(h.mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_ledger_failure_does_not_block_approval() {
    let h = Harness::with_ledger(Arc::new(FailingLedger));
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Baklava").await;
    let service = h.certifications();

    let cert = service
        .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
        .await
        .unwrap();
    let approved = service
        .update_status(&certifier, cert.id, status("approved"))
        .await
        .unwrap();

    assert_eq!(approved.status, CertificationStatus::Approved);
    assert!(approved.issued_date.is_some());
    assert!(approved.ledger_id.is_none());
    assert!(approved.ledger_tx_hash.is_none());
    assert_eq!(h.mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_mail_failure_does_not_block_approval() {
    let ledger = Arc::new(RecordingLedger::default());
    let h = Harness::with_ledger(ledger.clone()).with_mailer(Arc::new(FailingMailer));
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Date Syrup").await;
    let service = h.certifications();

    let cert = service
        .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
        .await
        .unwrap();
    let approved = service
        .update_status(&certifier, cert.id, status("approved"))
        .await
        .unwrap();

    assert_eq!(approved.status, CertificationStatus::Approved);
    assert!(approved.issued_date.is_some());
    assert_eq!(approved.ledger_id.as_deref(), Some("cert-1"));

    let stored = h.store.find_certification(cert.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CertificationStatus::Approved);
}

#[tokio::test]
async fn test_revocation_records_reason_and_revokes_on_ledger() {
    let ledger = Arc::new(RecordingLedger::default());
    let h = Harness::with_ledger(ledger.clone());
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Gelatin Sweets").await;
    let service = h.certifications();

    let cert = service
        .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
        .await
        .unwrap();
    service
        .update_status(&certifier, cert.id, status("approved"))
        .await
        .unwrap();
    let revoked = service
        .update_status(
            &certifier,
            cert.id,
            StatusChange {
                status: "revoked".to_string(),
                revocation_reason: Some("quality issue".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(revoked.status, CertificationStatus::Revoked);
    assert_eq!(revoked.revocation_reason.as_deref(), Some("quality issue"));
    assert_eq!(ledger.calls().last().map(String::as_str), Some("revoke:cert-1"));
}

#[tokio::test]
async fn test_revocation_without_reason_uses_default() {
    let h = Harness::new();
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Honey").await;
    let service = h.certifications();

    let cert = service
        .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
        .await
        .unwrap();
    let revoked = service
        .update_status(&certifier, cert.id, status("revoked"))
        .await
        .unwrap();

    assert_eq!(
        revoked.revocation_reason.as_deref(),
        Some(DEFAULT_REVOCATION_REASON)
    );
}

#[tokio::test]
async fn test_status_update_authorization() {
    let h = Harness::new();
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let other_certifier = h.account(Role::Certifier, "Certifier Two").await;
    let admin = h.account(Role::Admin, "Admin").await;
    let product = h.product_for(&vendor, "Olive Oil").await;
    let service = h.certifications();

    let cert = service
        .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
        .await
        .unwrap();

    for actor in [vendor, other_certifier] {
        let err = service
            .update_status(&actor, cert.id, status("rejected"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    let updated = service
        .update_status(&admin, cert.id, status("rejected"))
        .await
        .unwrap();
    assert_eq!(updated.status, CertificationStatus::Rejected);
}

#[tokio::test]
async fn test_unknown_status_is_a_validation_error() {
    let h = Harness::new();
    let admin = h.account(Role::Admin, "Admin").await;

    let err = h
        .certifications()
        .update_status(&admin, Uuid::new_v4(), status("suspended"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "status"));
}

// ============================================================================
// Reads and verification
// ============================================================================

#[tokio::test]
async fn test_listing_is_scoped_by_role() {
    let h = Harness::new();
    let vendor_a = h.account(Role::Vendor, "Vendor A").await;
    let vendor_b = h.account(Role::Vendor, "Vendor B").await;
    let certifier_a = h.account(Role::Certifier, "Certifier A").await;
    let certifier_b = h.account(Role::Certifier, "Certifier B").await;
    let admin = h.account(Role::Admin, "Admin").await;
    let product_a = h.product_for(&vendor_a, "Product A").await;
    let product_b = h.product_for(&vendor_b, "Product B").await;
    let service = h.certifications();

    service
        .create_certification(&certifier_a, new_certification(product_a.id, expiry_in_days(30)))
        .await
        .unwrap();
    service
        .create_certification(&certifier_b, new_certification(product_b.id, expiry_in_days(30)))
        .await
        .unwrap();

    let all = service
        .list_certifications(&admin, CertificationQuery::default())
        .await
        .unwrap();
    assert_eq!(all.pagination.total, 2);

    let mine = service
        .list_certifications(&certifier_a, CertificationQuery::default())
        .await
        .unwrap();
    assert_eq!(mine.items.len(), 1);
    assert_eq!(mine.items[0].certifier_id, certifier_a.id);

    let vendor_view = service
        .list_certifications(&vendor_b, CertificationQuery::default())
        .await
        .unwrap();
    assert_eq!(vendor_view.items.len(), 1);
    assert_eq!(vendor_view.items[0].product_id, product_b.id);
}

#[tokio::test]
async fn test_listing_filters_by_status_and_pages() {
    let h = Harness::new();
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Olive Oil").await;
    let service = h.certifications();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let cert = service
            .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
            .await
            .unwrap();
        ids.push(cert.id);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    service
        .update_status(&certifier, ids[1], status("approved"))
        .await
        .unwrap();

    let approved = service
        .list_certifications(
            &certifier,
            CertificationQuery {
                status: Some("approved".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(approved.pagination.total, 1);
    assert_eq!(approved.items[0].id, ids[1]);

    let pending = service
        .list_certifications(
            &certifier,
            CertificationQuery {
                status: Some("pending".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(pending.pagination.total, 2);
    assert!(pending
        .items
        .iter()
        .all(|c| c.status == CertificationStatus::Pending));

    let page = |n: u32| CertificationQuery {
        page: Some(n),
        limit: Some(1),
        ..Default::default()
    };

    let first = service.list_certifications(&certifier, page(1)).await.unwrap();
    assert_eq!(first.items.len(), 1);
    assert_eq!(first.pagination.total, 3);
    assert_eq!(first.pagination.next.map(|r| r.page), Some(2));
    assert!(first.pagination.prev.is_none());
    // Newest first
    assert_eq!(first.items[0].id, ids[2]);

    let second = service.list_certifications(&certifier, page(2)).await.unwrap();
    assert_eq!(second.pagination.prev.map(|r| r.page), Some(1));
    assert_eq!(second.pagination.next.map(|r| r.page), Some(3));
    assert_eq!(second.items[0].id, ids[1]);

    let last = service.list_certifications(&certifier, page(3)).await.unwrap();
    assert!(last.pagination.next.is_none());
    assert_eq!(last.pagination.prev.map(|r| r.page), Some(2));
    assert_eq!(last.items[0].id, ids[0]);

    let err = service
        .list_certifications(
            &certifier,
            CertificationQuery {
                status: Some("archived".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "status"));
}

#[tokio::test]
async fn test_get_certification_is_limited_to_parties() {
    let h = Harness::new();
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let stranger = h.account(Role::Vendor, "Vendor Two").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Ghee").await;
    let service = h.certifications();

    let cert = service
        .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
        .await
        .unwrap();

    assert!(service.get_certification(&vendor, cert.id).await.is_ok());
    assert!(service.get_certification(&certifier, cert.id).await.is_ok());
    assert!(matches!(
        service.get_certification(&stranger, cert.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        service.get_certification(&vendor, Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_verify_unknown_number_is_not_found() {
    let h = Harness::new();
    let err = h
        .certifications()
        .verify_certification("HALAL-00000000-000")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_approved_but_expired_certification_is_invalid() {
    let h = Harness::new();
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Rice Crackers").await;
    let service = h.certifications();

    let cert = service
        .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
        .await
        .unwrap();
    let mut approved = service
        .update_status(&certifier, cert.id, status("approved"))
        .await
        .unwrap();

    approved.expiry_date = Utc::now() - Duration::days(1);
    h.store.update_certification(&approved).await.unwrap();

    let verification = service
        .verify_certification(&approved.certificate_number)
        .await
        .unwrap();
    assert!(verification.is_expired);
    assert!(!verification.is_valid);
}

#[tokio::test]
async fn test_end_to_end_lifecycle() {
    let h = Harness::new();
    let vendor = h.account(Role::Vendor, "Vendor One").await;
    let certifier = h.account(Role::Certifier, "Certifier One").await;
    let product = h.product_for(&vendor, "Product P").await;
    let service = h.certifications();

    let cert = service
        .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
        .await
        .unwrap();
    assert_eq!(cert.status, CertificationStatus::Pending);

    let approved = service
        .update_status(&certifier, cert.id, status("approved"))
        .await
        .unwrap();
    assert_eq!(approved.status, CertificationStatus::Approved);
    assert!(approved.issued_date.is_some());

    let verification = service
        .verify_certification(&cert.certificate_number)
        .await
        .unwrap();
    assert!(verification.is_valid);
    assert!(!verification.is_expired);

    service
        .update_status(
            &certifier,
            cert.id,
            StatusChange {
                status: "revoked".to_string(),
                revocation_reason: Some("quality issue".to_string()),
            },
        )
        .await
        .unwrap();

    let verification = service
        .verify_certification(&cert.certificate_number)
        .await
        .unwrap();
    assert!(!verification.is_valid);
    assert_eq!(
        verification.certification.revocation_reason.as_deref(),
        Some("quality issue")
    );
}

// ============================================================================
// Property-Based Tests
// ============================================================================

fn non_approved_status() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["pending", "rejected", "expired", "revoked"])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any future expiry yields a pending record with a well-formed number
    #[test]
    fn prop_created_certifications_are_pending(days in 2i64..3650) {
        let cert = tokio_test::block_on(async {
            let h = Harness::new();
            let vendor = h.account(Role::Vendor, "Vendor").await;
            let certifier = h.account(Role::Certifier, "Certifier").await;
            let product = h.product_for(&vendor, "Product").await;
            h.certifications()
                .create_certification(&certifier, new_certification(product.id, expiry_in_days(days)))
                .await
                .unwrap()
        });

        prop_assert_eq!(cert.status, CertificationStatus::Pending);
        prop_assert!(is_certificate_number(PREFIX, &cert.certificate_number));
    }

    /// Only approved certifications verify as valid
    #[test]
    fn prop_non_approved_is_never_valid(target in non_approved_status()) {
        let verification = tokio_test::block_on(async {
            let h = Harness::new();
            let vendor = h.account(Role::Vendor, "Vendor").await;
            let certifier = h.account(Role::Certifier, "Certifier").await;
            let product = h.product_for(&vendor, "Product").await;
            let service = h.certifications();
            let cert = service
                .create_certification(&certifier, new_certification(product.id, expiry_in_days(30)))
                .await
                .unwrap();
            service.update_status(&certifier, cert.id, status(target)).await.unwrap();
            service.verify_certification(&cert.certificate_number).await.unwrap()
        });

        prop_assert!(!verification.is_valid);
        prop_assert!(!verification.is_expired);
    }
}
