//! Configuration management for the Halal Marketplace
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with HMP__ prefix

use config::{builder::DefaultState, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

/// Signing secret used when none is configured; refused in production
pub const DEV_JWT_SECRET: &str = "development-secret-key";

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Persistence backend selection
    pub storage: StorageConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Ledger contract gateway
    pub ledger: LedgerConfig,

    /// IPFS node and gateway
    pub ipfs: IpfsConfig,

    /// Transactional email API
    pub mail: MailConfig,

    /// Chat-completion API
    pub llm: LlmConfig,

    /// Certification workflow settings
    pub certification: CertificationConfig,

    /// Log output settings
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for verifying HS256 tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Base URL of the contract gateway
    pub gateway_url: String,

    /// Certification contract address; the zero address means unconfigured
    pub contract_address: String,

    /// Optional gateway API key
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IpfsConfig {
    /// IPFS HTTP API base URL
    pub api_url: String,

    /// Public gateway used to build retrieval URLs
    pub gateway_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    /// Transactional email API endpoint
    pub api_url: String,

    /// API key; mail is disabled when absent
    pub api_key: Option<String>,

    /// Sender address
    pub from_address: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Chat-completion endpoint
    pub api_url: String,

    /// API key; assessments are disabled when absent
    pub api_key: Option<String>,

    /// Model name
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CertificationConfig {
    /// Certificate number prefix
    pub number_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("HMP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = Self::defaults(&environment)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (HMP_ prefix)
            .add_source(
                Environment::with_prefix("HMP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Configuration built from code defaults only
    pub fn from_defaults(environment: &str) -> Result<Self, ConfigError> {
        Self::defaults(environment)?.build()?.try_deserialize()
    }

    fn defaults(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("environment", environment)?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.url", "postgres://localhost/halal_marketplace")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("storage.backend", "postgres")?
            .set_default("jwt.secret", DEV_JWT_SECRET)?
            .set_default("ledger.gateway_url", "http://127.0.0.1:8545")?
            .set_default("ledger.contract_address", crate::external::ledger::ZERO_ADDRESS)?
            .set_default("ledger.timeout_secs", 30)?
            .set_default("ipfs.api_url", "http://127.0.0.1:5001")?
            .set_default("ipfs.timeout_secs", 30)?
            .set_default("mail.api_url", "https://api.sendgrid.com/v3/mail/send")?
            .set_default("mail.from_address", "no-reply@halal-marketplace.local")?
            .set_default("mail.timeout_secs", 30)?
            .set_default("llm.api_url", "https://api.openai.com/v1/chat/completions")?
            .set_default("llm.model", "gpt-4o-mini")?
            .set_default("llm.timeout_secs", 60)?
            .set_default(
                "certification.number_prefix",
                shared::DEFAULT_CERTIFICATE_PREFIX,
            )?
            .set_default("log.json", false)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
