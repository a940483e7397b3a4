//! Error handling for the analytics toolbox.

use thiserror::Error;

/// Main error type for the analytics toolbox
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed account/mint identifier. Raised before any network call.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Well-formed address with no resolvable on-chain or catalog entry.
    #[error("Token not found: {0}")]
    TokenNotFound(String),

    /// Retry budget consumed without a successful attempt.
    #[error("Network retries exhausted for {operation} after {attempts} attempts: {last_error}")]
    NetworkExhausted {
        operation: String,
        attempts: usize,
        last_error: String,
    },

    /// Both news providers failed.
    #[error("News unavailable: {0}")]
    NewsUnavailable(String),

    /// Catalog resolved an id but the price provider omitted it.
    #[error("Price data missing for {0}")]
    PriceDataMissing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Chain RPC errors
    #[error("RPC error: {0}")]
    RpcError(String),

    /// Data-related errors (missing or malformed provider data)
    #[error("Data error: {0}")]
    DataError(String),

    /// Tool input/output failed schema validation
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// Request errors
    #[error("Request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for the analytics toolbox
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Short machine-readable kind tag, used by the tool layer when shaping
    /// structured failure objects.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidAddress(_) => "invalid_address",
            Error::TokenNotFound(_) => "token_not_found",
            Error::NetworkExhausted { .. } => "network_exhausted",
            Error::NewsUnavailable(_) => "news_unavailable",
            Error::PriceDataMissing(_) => "price_data_missing",
            Error::ConfigError(_) => "config",
            Error::RpcError(_) => "rpc",
            Error::DataError(_) => "data",
            Error::SchemaError(_) => "schema",
            Error::IoError(_) => "io",
            Error::JsonError(_) => "json",
            Error::TomlError(_) | Error::TomlSerializeError(_) => "toml",
            Error::ReqwestError(_) => "request",
            Error::Other(_) => "other",
        }
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

// Allow automatic conversion from anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<solana_client::client_error::ClientError> for Error {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        Error::RpcError(err.to_string())
    }
}
