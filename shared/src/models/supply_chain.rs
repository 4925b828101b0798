//! Supply chain audit trail models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ParseEnumError;
use crate::types::GeoPoint;

/// One entry in a product's append-only supply chain log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyChainEvent {
    pub id: Uuid,
    pub product_id: Uuid,
    pub stage: SupplyChainStage,
    pub actor_id: Uuid,
    pub location: GeoPoint,
    pub occurred_at: DateTime<Utc>,
    pub description: String,
    pub attachments: Vec<String>,
    pub sensor_readings: Option<SensorReadings>,
    pub extra: Option<serde_json::Value>,
    pub ledger_tx_hash: Option<String>,
    pub metadata_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Stages a product passes through
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SupplyChainStage {
    Sourcing,
    Slaughtering,
    Processing,
    Packaging,
    Storage,
    Distribution,
    Retail,
}

impl SupplyChainStage {
    pub const ALL: [SupplyChainStage; 7] = [
        SupplyChainStage::Sourcing,
        SupplyChainStage::Slaughtering,
        SupplyChainStage::Processing,
        SupplyChainStage::Packaging,
        SupplyChainStage::Storage,
        SupplyChainStage::Distribution,
        SupplyChainStage::Retail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyChainStage::Sourcing => "sourcing",
            SupplyChainStage::Slaughtering => "slaughtering",
            SupplyChainStage::Processing => "processing",
            SupplyChainStage::Packaging => "packaging",
            SupplyChainStage::Storage => "storage",
            SupplyChainStage::Distribution => "distribution",
            SupplyChainStage::Retail => "retail",
        }
    }
}

impl std::fmt::Display for SupplyChainStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SupplyChainStage {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SupplyChainStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| {
                ParseEnumError::new("stage", s, &SupplyChainStage::ALL.map(|st| st.as_str()))
            })
    }
}

/// Optional environmental readings captured with an event
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SensorReadings {
    pub temperature_celsius: Option<Decimal>,
    pub humidity_percent: Option<Decimal>,
}

/// Input for appending a supply chain event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSupplyChainEvent {
    pub stage: String,
    pub location: GeoPoint,
    /// Defaults to the time of recording
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub sensor_readings: Option<SensorReadings>,
    pub extra: Option<serde_json::Value>,
}

/// Metadata document pushed to content storage for an event
#[derive(Debug, Clone, Serialize)]
pub struct SupplyChainMetadata<'a> {
    pub event_id: Uuid,
    pub product_id: Uuid,
    pub stage: SupplyChainStage,
    pub actor_id: Uuid,
    pub location: &'a GeoPoint,
    pub occurred_at: DateTime<Utc>,
    pub sensor_readings: Option<&'a SensorReadings>,
}

impl<'a> From<&'a SupplyChainEvent> for SupplyChainMetadata<'a> {
    fn from(event: &'a SupplyChainEvent) -> Self {
        Self {
            event_id: event.id,
            product_id: event.product_id,
            stage: event.stage,
            actor_id: event.actor_id,
            location: &event.location,
            occurred_at: event.occurred_at,
            sensor_readings: event.sensor_readings.as_ref(),
        }
    }
}
