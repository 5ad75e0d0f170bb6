//! # Client Configuration
//!
//! Configuration management for the checkout engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TILL_SERVICE_URL=https://api.example.com/v1                        │
//! │     TILL_SERVICE_ID=store-001                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/till/till.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.till.till/till.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     localhost service, kitchen enabled, 2.5s polling, 0.01 tolerance   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # till.toml
//! [service]
//! base_url = "https://api.example.com/v1"
//! service_id = "store-001"
//! service_header = "X-Service-Id"
//! api_token = "secret"
//! request_timeout_secs = 15
//! connect_timeout_secs = 5
//!
//! [kitchen]
//! enabled = true
//! poll_interval_ms = 2500
//!
//! [checkout]
//! payment_tolerance = "0.01"
//! fallback_error_message = "The transaction could not be completed."
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use till_core::validation::validate_tolerance;
use till_core::Money;

use crate::error::{ClientError, ClientResult};

// =============================================================================
// Service Settings
// =============================================================================

/// How to reach the transaction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Base URL; endpoint paths are joined onto it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Active tenant/service context, sent on every request.
    #[serde(default = "default_service_id")]
    pub service_id: String,

    /// Header carrying `service_id`.
    #[serde(default = "default_service_header")]
    pub service_header: String,

    /// Optional bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_service_id() -> String {
    "default".to_string()
}

fn default_service_header() -> String {
    "X-Service-Id".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_connect_timeout() -> u64 {
    5
}

impl Default for ServiceSettings {
    fn default() -> Self {
        ServiceSettings {
            base_url: default_base_url(),
            service_id: default_service_id(),
            service_header: default_service_header(),
            api_token: None,
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl ServiceSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// =============================================================================
// Kitchen Settings
// =============================================================================

/// Kitchen-order management settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitchenSettings {
    /// Feature flag for kitchen-order management in this service context.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Open-order feed polling interval (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    2500
}

impl Default for KitchenSettings {
    fn default() -> Self {
        KitchenSettings {
            enabled: true,
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl KitchenSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// Checkout Settings
// =============================================================================

/// Checkout behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// Allowed deviation between tendered payments and the amount due.
    #[serde(default = "default_tolerance")]
    pub payment_tolerance: String,

    /// Message shown when a failure carries no server-provided text.
    #[serde(default = "default_fallback_message")]
    pub fallback_error_message: String,
}

fn default_tolerance() -> String {
    "0.01".to_string()
}

fn default_fallback_message() -> String {
    "The transaction could not be completed.".to_string()
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            payment_tolerance: default_tolerance(),
            fallback_error_message: default_fallback_message(),
        }
    }
}

impl CheckoutSettings {
    /// Parsed tolerance; falls back to one cent when unparseable.
    pub fn tolerance(&self) -> Money {
        validate_tolerance(&self.payment_tolerance).unwrap_or(till_core::PAYMENT_TOLERANCE)
    }
}

// =============================================================================
// Main Client Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub service: ServiceSettings,

    #[serde(default)]
    pub kitchen: KitchenSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (till.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading till config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load till config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ClientResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ClientError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClientError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ClientError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Till config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        let base_url = self.service.base_url.trim();
        if base_url.is_empty() {
            return Err(ClientError::InvalidUrl("Service URL is empty".into()));
        }

        let parsed = url::Url::parse(base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "Service URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        if self.service.service_id.trim().is_empty() {
            return Err(ClientError::InvalidConfig("service_id must not be empty".into()));
        }

        if self.service.service_header.trim().is_empty() {
            return Err(ClientError::InvalidConfig(
                "service_header must not be empty".into(),
            ));
        }

        if self.service.request_timeout_secs == 0 || self.service.connect_timeout_secs == 0 {
            return Err(ClientError::InvalidConfig(
                "timeouts must be greater than 0".into(),
            ));
        }

        if self.kitchen.poll_interval_ms == 0 {
            return Err(ClientError::InvalidConfig(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }

        validate_tolerance(&self.checkout.payment_tolerance)
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TILL_SERVICE_URL") {
            debug!(url = %url, "Overriding service URL from environment");
            self.service.base_url = url;
        }

        if let Ok(id) = std::env::var("TILL_SERVICE_ID") {
            debug!(service_id = %id, "Overriding service ID from environment");
            self.service.service_id = id;
        }

        if let Ok(token) = std::env::var("TILL_API_TOKEN") {
            self.service.api_token = Some(token).filter(|t| !t.is_empty());
        }

        if let Ok(enabled) = std::env::var("TILL_KITCHEN_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.kitchen.enabled = true,
                "0" | "false" | "no" | "off" => self.kitchen.enabled = false,
                _ => warn!(value = %enabled, "Unknown TILL_KITCHEN_ENABLED value"),
            }
        }

        if let Ok(interval) = std::env::var("TILL_POLL_INTERVAL_MS") {
            if let Ok(ms) = interval.parse::<u64>() {
                debug!(poll_interval_ms = ms, "Overriding poll interval from environment");
                self.kitchen.poll_interval_ms = ms;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "till", "till")
            .map(|dirs| dirs.config_dir().join("till.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.service.service_header, "X-Service-Id");
        assert_eq!(config.kitchen.poll_interval(), Duration::from_millis(2500));
        assert!(config.kitchen.enabled);
        assert_eq!(config.checkout.tolerance(), Money::from_cents(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();

        config.service.base_url = "ws://localhost:8080".into();
        assert!(matches!(config.validate(), Err(ClientError::InvalidUrl(_))));

        config.service.base_url = "not a url".into();
        assert!(matches!(config.validate(), Err(ClientError::InvalidUrl(_))));

        config.service.base_url = "https://api.example.com/v1".into();
        assert!(config.validate().is_ok());

        config.service.service_id = "  ".into();
        assert!(config.validate().is_err());
        config.service.service_id = "store-001".into();

        config.kitchen.poll_interval_ms = 0;
        assert!(config.validate().is_err());
        config.kitchen.poll_interval_ms = 2500;

        config.checkout.payment_tolerance = "-0.01".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_parsing_with_partial_sections() {
        let config: ClientConfig = toml::from_str(
            r#"
            [service]
            base_url = "https://api.example.com/v1"
            service_id = "store-042"

            [checkout]
            payment_tolerance = "0,05"
            "#,
        )
        .unwrap();

        assert_eq!(config.service.service_id, "store-042");
        assert_eq!(config.service.request_timeout_secs, 15);
        assert_eq!(config.kitchen.poll_interval_ms, 2500);
        assert_eq!(config.checkout.tolerance(), Money::from_cents(5));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("till-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("till.toml");

        let mut config = ClientConfig::default();
        config.service.service_id = "store-777".into();
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[service]"));
        assert!(contents.contains("store-777"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
