//! Certification models

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ParseEnumError;

/// A halal certification issued for a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certification {
    pub id: Uuid,
    pub certificate_number: String,
    pub product_id: Uuid,
    pub certifier_id: Uuid,
    pub vendor_id: Uuid,
    pub status: CertificationStatus,
    pub issued_date: Option<DateTime<Utc>>,
    pub expiry_date: DateTime<Utc>,
    pub documents: Vec<CertificationDocument>,
    pub inspection_details: InspectionDetails,
    pub ledger_tx_hash: Option<String>,
    pub ledger_id: Option<String>,
    pub metadata_ref: Option<String>,
    pub revocation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Certification {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_date
    }

    /// Approved and not past its expiry date
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CertificationStatus::Approved && !self.is_expired_at(now)
    }
}

/// Status of a certification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CertificationStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    Revoked,
}

impl CertificationStatus {
    pub const ALL: [CertificationStatus; 5] = [
        CertificationStatus::Pending,
        CertificationStatus::Approved,
        CertificationStatus::Rejected,
        CertificationStatus::Expired,
        CertificationStatus::Revoked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CertificationStatus::Pending => "pending",
            CertificationStatus::Approved => "approved",
            CertificationStatus::Rejected => "rejected",
            CertificationStatus::Expired => "expired",
            CertificationStatus::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for CertificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CertificationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CertificationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ParseEnumError::new(
                    "status",
                    s,
                    &CertificationStatus::ALL.map(|st| st.as_str()),
                )
            })
    }
}

/// A supporting document attached to a certification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CertificationDocument {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
}

/// Results of the on-site inspection backing a certification
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InspectionDetails {
    #[serde(default)]
    pub inspector_name: Option<String>,
    #[serde(default)]
    pub inspection_date: Option<NaiveDate>,
    #[serde(default)]
    pub findings: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Input for creating a certification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCertification {
    pub product_id: Uuid,
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub expiry_date: String,
    #[serde(default)]
    pub documents: Vec<CertificationDocument>,
    #[serde(default)]
    pub inspection_details: InspectionDetails,
}

/// Input for a status transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: String,
    pub revocation_reason: Option<String>,
}

/// Metadata document pushed to content storage when a certification is created
#[derive(Debug, Clone, Serialize)]
pub struct CertificationMetadata {
    pub certification_id: Uuid,
    pub certificate_number: String,
    pub product_id: Uuid,
    pub certifier_id: Uuid,
    pub vendor_id: Uuid,
    pub status: CertificationStatus,
    pub expiry_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Certification> for CertificationMetadata {
    fn from(c: &Certification) -> Self {
        Self {
            certification_id: c.id,
            certificate_number: c.certificate_number.clone(),
            product_id: c.product_id,
            certifier_id: c.certifier_id,
            vendor_id: c.vendor_id,
            status: c.status,
            expiry_date: c.expiry_date,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Result of a public certificate lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificationVerification {
    pub certification: Certification,
    pub is_valid: bool,
    pub is_expired: bool,
}

/// Default certificate number prefix
pub const DEFAULT_CERTIFICATE_PREFIX: &str = "HALAL";

/// Reason recorded when a revocation does not supply one
pub const DEFAULT_REVOCATION_REASON: &str = "No reason provided";

/// Build a certificate number: `PREFIX-<last 8 digits of epoch millis>-<3 random digits>`
pub fn generate_certificate_number<R: Rng>(
    prefix: &str,
    now: DateTime<Utc>,
    rng: &mut R,
) -> String {
    let millis = now.timestamp_millis().unsigned_abs() % 100_000_000;
    let suffix: u16 = rng.gen_range(0..1000);
    format!("{}-{:08}-{:03}", prefix, millis, suffix)
}

/// Check that a string has the certificate number shape for the given prefix
pub fn is_certificate_number(prefix: &str, candidate: &str) -> bool {
    let Some(rest) = candidate
        .strip_prefix(prefix)
        .and_then(|r| r.strip_prefix('-'))
    else {
        return false;
    };

    let mut parts = rest.split('-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(stamp), Some(random), None) => {
            stamp.len() == 8
                && random.len() == 3
                && stamp.chars().all(|c| c.is_ascii_digit())
                && random.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}
