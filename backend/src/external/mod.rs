//! External service integrations
//!
//! Every integration sits behind a trait so services receive injected
//! instances. Failures are reported as [`AdapterError`], which never
//! reaches an HTTP caller directly.

pub mod ipfs;
pub mod ledger;
pub mod llm;
pub mod mail;

use std::sync::Arc;

use thiserror::Error;

pub use ipfs::{put_json, ContentStore, IpfsClient};
pub use ledger::{
    HttpLedgerClient, LedgerClient, LedgerReceipt, LedgerRecord, LedgerVerification,
};
pub use llm::{ChatCompletionClient, LanguageModel};
pub use mail::{DeliveryInfo, HttpMailer, Mailer};

use crate::config::Config;

/// Failure of an external integration
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("{0} is not configured")]
    Unconfigured(&'static str),

    #[error("request to {service} failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned {status}: {body}")]
    Rejected {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("could not decode {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl AdapterError {
    pub(crate) fn transport(service: &'static str, err: impl std::fmt::Display) -> Self {
        AdapterError::Transport {
            service,
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(service: &'static str, err: impl std::fmt::Display) -> Self {
        AdapterError::Decode {
            service,
            message: err.to_string(),
        }
    }

    /// Turn a non-success response into `Rejected`
    pub(crate) async fn check(
        service: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, Self> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(AdapterError::Rejected {
            service,
            status,
            body,
        })
    }
}

/// Injected set of external integrations
#[derive(Clone)]
pub struct Adapters {
    pub ledger: Arc<dyn LedgerClient>,
    pub content: Arc<dyn ContentStore>,
    pub mailer: Arc<dyn Mailer>,
    pub llm: Arc<dyn LanguageModel>,
}

impl Adapters {
    /// Build the HTTP-backed integrations from configuration
    pub fn from_config(config: &Config) -> Result<Self, AdapterError> {
        Ok(Self {
            ledger: Arc::new(HttpLedgerClient::new(&config.ledger)?),
            content: Arc::new(IpfsClient::new(&config.ipfs)?),
            mailer: Arc::new(HttpMailer::new(&config.mail)?),
            llm: Arc::new(ChatCompletionClient::new(&config.llm)?),
        })
    }
}

/// Build a reqwest client with the given timeout
pub(crate) fn http_client(
    service: &'static str,
    timeout_secs: u64,
) -> Result<reqwest::Client, AdapterError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AdapterError::transport(service, e))
}
