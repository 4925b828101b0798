//! Ledger contract client
//!
//! Submits certification transactions to the halal registry contract via a
//! JSON contract gateway and reads verification state back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{http_client, AdapterError};
use crate::config::LedgerConfig;
use shared::SupplyChainStage;

const SERVICE: &str = "ledger";

/// Sentinel contract address meaning "no contract deployed"
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Transaction that created a ledger record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerRecord {
    pub tx_hash: String,
    pub block_number: u64,
    pub ledger_id: String,
}

/// Transaction receipt without a new record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerReceipt {
    pub tx_hash: String,
    pub block_number: u64,
}

/// On-chain verification state for a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerVerification {
    pub is_valid: bool,
    pub ledger_id: Option<String>,
    pub certifier_address: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Halal registry contract operations
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn create_certification(
        &self,
        product_id: Uuid,
        vendor_address: &str,
        validity_period_secs: u64,
        metadata_ref: Option<&str>,
    ) -> Result<LedgerRecord, AdapterError>;

    async fn revoke_certification(&self, ledger_id: &str) -> Result<LedgerReceipt, AdapterError>;

    async fn verify(&self, product_id: Uuid) -> Result<LedgerVerification, AdapterError>;

    async fn register_product(
        &self,
        product_id: Uuid,
        metadata_ref: Option<&str>,
    ) -> Result<LedgerRecord, AdapterError>;

    async fn record_supply_chain_event(
        &self,
        product_id: Uuid,
        stage: SupplyChainStage,
        metadata_ref: Option<&str>,
    ) -> Result<LedgerReceipt, AdapterError>;
}

/// Contract gateway client
#[derive(Clone)]
pub struct HttpLedgerClient {
    http_client: Client,
    base_url: String,
    contract_address: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateCertificationRequest<'a> {
    product_id: Uuid,
    vendor_address: &'a str,
    validity_period_secs: u64,
    metadata_ref: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RegisterProductRequest<'a> {
    product_id: Uuid,
    metadata_ref: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RecordEventRequest<'a> {
    stage: SupplyChainStage,
    metadata_ref: Option<&'a str>,
}

impl HttpLedgerClient {
    pub fn new(config: &LedgerConfig) -> Result<Self, AdapterError> {
        Ok(Self {
            http_client: http_client(SERVICE, config.timeout_secs)?,
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            contract_address: config.contract_address.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        !is_zero_address(&self.contract_address)
    }

    fn contract_url(&self, path: &str) -> Result<String, AdapterError> {
        if !self.is_configured() {
            return Err(AdapterError::Unconfigured("ledger contract"));
        }
        Ok(format!(
            "{}/contracts/{}/{}",
            self.base_url, self.contract_address, path
        ))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, AdapterError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let url = self.contract_url(path)?;
        let response = self
            .authorize(self.http_client.post(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| AdapterError::transport(SERVICE, e))?;

        AdapterError::check(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| AdapterError::decode(SERVICE, e))
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn create_certification(
        &self,
        product_id: Uuid,
        vendor_address: &str,
        validity_period_secs: u64,
        metadata_ref: Option<&str>,
    ) -> Result<LedgerRecord, AdapterError> {
        let request = CreateCertificationRequest {
            product_id,
            vendor_address,
            validity_period_secs,
            metadata_ref,
        };
        let record: LedgerRecord = self.post("certifications", &request).await?;
        tracing::info!(
            tx_hash = %record.tx_hash,
            block = record.block_number,
            "Certification recorded on ledger"
        );
        Ok(record)
    }

    async fn revoke_certification(&self, ledger_id: &str) -> Result<LedgerReceipt, AdapterError> {
        let path = format!("certifications/{}/revoke", ledger_id);
        self.post(&path, &serde_json::json!({})).await
    }

    async fn verify(&self, product_id: Uuid) -> Result<LedgerVerification, AdapterError> {
        let url = self.contract_url(&format!("products/{}/verification", product_id))?;
        let response = self
            .authorize(self.http_client.get(&url))
            .send()
            .await
            .map_err(|e| AdapterError::transport(SERVICE, e))?;

        AdapterError::check(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| AdapterError::decode(SERVICE, e))
    }

    async fn register_product(
        &self,
        product_id: Uuid,
        metadata_ref: Option<&str>,
    ) -> Result<LedgerRecord, AdapterError> {
        let request = RegisterProductRequest {
            product_id,
            metadata_ref,
        };
        self.post("products", &request).await
    }

    async fn record_supply_chain_event(
        &self,
        product_id: Uuid,
        stage: SupplyChainStage,
        metadata_ref: Option<&str>,
    ) -> Result<LedgerReceipt, AdapterError> {
        let path = format!("products/{}/events", product_id);
        self.post(&path, &RecordEventRequest { stage, metadata_ref })
            .await
    }
}

/// True for the all-zero address, with or without `0x`
pub fn is_zero_address(address: &str) -> bool {
    let hex = address.strip_prefix("0x").unwrap_or(address);
    hex.is_empty() || hex.chars().all(|c| c == '0')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(address: &str) -> LedgerConfig {
        LedgerConfig {
            gateway_url: "http://gateway.test/".to_string(),
            contract_address: address.to_string(),
            api_key: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn zero_address_detection() {
        assert!(is_zero_address(ZERO_ADDRESS));
        assert!(is_zero_address("0x"));
        assert!(!is_zero_address("0x5FbDB2315678afecb367f032d93F642f64180aa3"));
    }

    #[tokio::test]
    async fn unconfigured_contract_fails_without_network() {
        let client = HttpLedgerClient::new(&config(ZERO_ADDRESS)).unwrap();
        let err = client.revoke_certification("7").await.unwrap_err();
        assert!(matches!(err, AdapterError::Unconfigured(_)));
    }

    #[test]
    fn contract_urls_drop_trailing_slash() {
        let client =
            HttpLedgerClient::new(&config("0x5FbDB2315678afecb367f032d93F642f64180aa3")).unwrap();
        assert_eq!(
            client.contract_url("certifications").unwrap(),
            "http://gateway.test/contracts/0x5FbDB2315678afecb367f032d93F642f64180aa3/certifications"
        );
    }
}
