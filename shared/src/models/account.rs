//! Account, role and capability models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ParseEnumError;

/// Role carried by an authenticated account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Certifier,
    Vendor,
    Customer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Certifier, Role::Vendor, Role::Customer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Certifier => "certifier",
            Role::Vendor => "vendor",
            Role::Customer => "customer",
        }
    }

    /// Role allow-list check. Ownership rules are layered on top by the services.
    pub fn allows(&self, capability: Capability) -> bool {
        use Capability::*;

        match self {
            Role::Admin => true,
            Role::Certifier => matches!(
                capability,
                CreateCertification
                    | ListCertifications
                    | ViewCertification
                    | UpdateCertificationStatus
                    | RequestAssessment
            ),
            Role::Vendor => matches!(
                capability,
                ListCertifications
                    | ViewCertification
                    | ManageProducts
                    | RecordSupplyChainEvent
                    | RequestAssessment
            ),
            Role::Customer => false,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| {
                ParseEnumError::new("role", s, &Role::ALL.map(|r| r.as_str()))
            })
    }
}

/// Actions gated by role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CreateCertification,
    ListCertifications,
    ViewCertification,
    UpdateCertificationStatus,
    ManageProducts,
    RecordSupplyChainEvent,
    RequestAssessment,
}

/// The authenticated caller of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.allows(capability)
    }
}

/// Contact details of an account, as needed for notifications and ledger calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountContact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub wallet_address: Option<String>,
}
