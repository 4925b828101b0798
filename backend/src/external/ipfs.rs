//! IPFS content-addressed storage client
//!
//! Uses the IPFS HTTP API (`/api/v0/add`, `/api/v0/cat`) for metadata blobs.

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};

use super::{http_client, AdapterError};
use crate::config::IpfsConfig;

const SERVICE: &str = "ipfs";

/// Content-addressed blob storage
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store bytes and return their content id
    async fn put(&self, bytes: Vec<u8>) -> Result<String, AdapterError>;

    async fn get(&self, content_id: &str) -> Result<Vec<u8>, AdapterError>;

    /// Public retrieval URL, when a gateway is known
    fn url_for(&self, content_id: &str) -> Option<String>;
}

/// Serialize a value as JSON and store it
pub async fn put_json<T: Serialize + ?Sized>(
    store: &dyn ContentStore,
    value: &T,
) -> Result<String, AdapterError> {
    let bytes = serde_json::to_vec(value).map_err(|e| AdapterError::decode(SERVICE, e))?;
    store.put(bytes).await
}

/// IPFS HTTP API client
#[derive(Clone)]
pub struct IpfsClient {
    http_client: Client,
    api_url: String,
    gateway_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

impl IpfsClient {
    pub fn new(config: &IpfsConfig) -> Result<Self, AdapterError> {
        Ok(Self {
            http_client: http_client(SERVICE, config.timeout_secs)?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            gateway_url: config
                .gateway_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
        })
    }
}

#[async_trait]
impl ContentStore for IpfsClient {
    async fn put(&self, bytes: Vec<u8>) -> Result<String, AdapterError> {
        let part = multipart::Part::bytes(bytes)
            .file_name("metadata.json")
            .mime_str("application/json")
            .map_err(|e| AdapterError::transport(SERVICE, e))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http_client
            .post(format!("{}/api/v0/add?pin=true", self.api_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AdapterError::transport(SERVICE, e))?;

        let added: AddResponse = AdapterError::check(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| AdapterError::decode(SERVICE, e))?;

        tracing::debug!(cid = %added.hash, "Stored metadata on IPFS");
        Ok(added.hash)
    }

    async fn get(&self, content_id: &str) -> Result<Vec<u8>, AdapterError> {
        let response = self
            .http_client
            .post(format!("{}/api/v0/cat", self.api_url))
            .query(&[("arg", content_id)])
            .send()
            .await
            .map_err(|e| AdapterError::transport(SERVICE, e))?;

        let bytes = AdapterError::check(SERVICE, response)
            .await?
            .bytes()
            .await
            .map_err(|e| AdapterError::transport(SERVICE, e))?;

        Ok(bytes.to_vec())
    }

    fn url_for(&self, content_id: &str) -> Option<String> {
        self.gateway_url
            .as_ref()
            .map(|gateway| format!("{}/ipfs/{}", gateway, content_id))
    }
}
