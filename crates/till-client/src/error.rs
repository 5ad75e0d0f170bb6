//! # Client Error Types
//!
//! Error types for checkout operations against the transaction service.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Client Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  SerializationFailed    │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  DeserializationFailed  │ │
//! │  │  ConfigLoad/Save│  │  Unavailable    │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │ Business Rules  │  │ Local Checks    │  │      Internal           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Rejected       │  │  Core           │  │  Internal               │ │
//! │  │  PaymentMismatch│  │  InvalidRecov-  │  │                         │ │
//! │  │  StockInsuff.   │  │  eredPrices     │  │                         │ │
//! │  │  SettlementFail │  │                 │  │                         │ │
//! │  │  PriceUpdateFail│  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these are retried automatically. `user_message()` gives the short
//! text the operator sees.

use thiserror::Error;
use till_core::{CoreError, ValidationError};

use crate::protocol::ServiceRejection;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Message shown for every transport or availability failure.
pub const TRANSPORT_USER_MESSAGE: &str =
    "The transaction service could not be reached. Check the connection and try again.";

/// Client error type covering all checkout failures.
#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid service URL.
    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Could not connect to the transaction service.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Service answered with a server error and no error code.
    #[error("Transaction service unavailable (HTTP {status})")]
    Unavailable { status: u16 },

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Failed to serialize a request.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Failed to deserialize a response.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    // =========================================================================
    // Business Rule Rejections
    // =========================================================================
    /// Raw rejection from the service, before the orchestrator interprets it.
    #[error("Rejected by transaction service: {0}")]
    Rejected(ServiceRejection),

    /// Tendered payments do not match the amount due. `local` is set when
    /// the till caught it before sending anything.
    #[error("Payment mismatch: {detail}")]
    PaymentMismatch { detail: String, local: bool },

    /// Not enough stock to settle.
    #[error("Insufficient stock: {detail}")]
    StockInsufficient { detail: String },

    /// Any other terminal settlement failure.
    #[error("Settlement failed: {message}")]
    SettlementFailed { message: String },

    /// A selling price update failed during missing-price recovery.
    #[error("Could not update the price of {product_id}: {message}")]
    PriceUpdateFailed { product_id: String, message: String },

    // =========================================================================
    // Local Validation
    // =========================================================================
    /// One or more recovered prices are not valid.
    #[error("{} recovered price(s) are invalid", .0.len())]
    InvalidRecoveredPrices(Vec<ValidationError>),

    /// Checkout rule violated locally.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal client error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            ClientError::ConnectionFailed(err.to_string())
        } else if err.is_decode() {
            ClientError::DeserializationFailed(err.to_string())
        } else if err.is_builder() {
            ClientError::InvalidConfig(err.to_string())
        } else {
            ClientError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::ConfigSaveFailed(err.to_string())
    }
}

impl From<ValidationError> for ClientError {
    fn from(err: ValidationError) -> Self {
        ClientError::Core(CoreError::Validation(err))
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ClientError {
    /// Returns true if the service could not be reached or was unavailable.
    ///
    /// The operator retries by triggering the action again.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectionFailed(_)
                | ClientError::Timeout(_)
                | ClientError::Unavailable { .. }
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidConfig(_)
                | ClientError::InvalidUrl(_)
                | ClientError::ConfigLoadFailed(_)
                | ClientError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if the service refused the request on business grounds.
    pub fn is_business_rejection(&self) -> bool {
        matches!(
            self,
            ClientError::Rejected(_)
                | ClientError::PaymentMismatch { local: false, .. }
                | ClientError::StockInsufficient { .. }
                | ClientError::SettlementFailed { .. }
                | ClientError::PriceUpdateFailed { .. }
        )
    }

    /// Returns true if the error was detected before any network call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ClientError::Core(_)
                | ClientError::InvalidRecoveredPrices(_)
                | ClientError::PaymentMismatch { local: true, .. }
        )
    }

    /// Short, user-readable message for display.
    pub fn user_message(&self) -> String {
        match self {
            e if e.is_transport() => TRANSPORT_USER_MESSAGE.to_string(),
            ClientError::PaymentMismatch { detail, .. }
            | ClientError::StockInsufficient { detail } => detail.clone(),
            ClientError::SettlementFailed { message } => message.clone(),
            ClientError::Rejected(rejection) => rejection.best_message().unwrap_or_else(|| {
                "The transaction service rejected the request.".to_string()
            }),
            ClientError::InvalidRecoveredPrices(errors) => errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
            ClientError::Core(core) => core.to_string(),
            other => other.to_string(),
        }
    }
}
