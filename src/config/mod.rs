use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Prefix of every environment variable the service reads
pub const ENV_PREFIX: &str = "HOSTEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub booking_api: BookingApiConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Where the cart and session slots live
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_cart_slot_key")]
    pub cart_slot_key: String,
    #[serde(default = "default_session_user_key")]
    pub session_user_key: String,
    #[serde(default = "default_session_role_key")]
    pub session_role_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingApiConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_api_timeout")]
    pub api_timeout_seconds: u64,
    #[serde(default)]
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

impl Config {
    pub fn from_environment() -> Result<Self, ConfigError> {
        Self::from_source(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load every section from one environment source
    pub fn from_source(source: config::Environment) -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");

        let settings = config::Config::builder()
            .add_source(source)
            .build()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to load config: {}", e),
            })?;

        let config = Config {
            server: deserialize_section(&settings, "server")?,
            storage: deserialize_section(&settings, "storage")?,
            booking_api: deserialize_section(&settings, "booking api")?,
            observability: deserialize_section(&settings, "observability")?,
        };

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Server port cannot be 0".to_string(),
            });
        }

        for (name, key) in [
            ("Cart slot key", &self.storage.cart_slot_key),
            ("Session user key", &self.storage.session_user_key),
            ("Session role key", &self.storage.session_role_key),
        ] {
            if key.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: format!("{} cannot be empty", name),
                });
            }
        }

        if self.booking_api.api_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Booking API timeout cannot be 0".to_string(),
            });
        }

        reqwest::Url::parse(&self.booking_api.api_base_url).map_err(|e| {
            ConfigError::ValidationError {
                message: format!(
                    "Invalid booking API base URL '{}': {}",
                    self.booking_api.api_base_url, e
                ),
            }
        })?;

        Ok(())
    }
}

fn deserialize_section<T: serde::de::DeserializeOwned>(
    settings: &config::Config,
    section: &str,
) -> Result<T, ConfigError> {
    settings
        .clone()
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl BookingApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_seconds)
    }
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

pub(crate) fn default_cart_slot_key() -> String {
    "cart".to_string()
}

pub(crate) fn default_session_user_key() -> String {
    "user".to_string()
}

pub(crate) fn default_session_role_key() -> String {
    "role".to_string()
}

pub(crate) fn default_api_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

pub(crate) fn default_api_timeout() -> u64 {
    30
}

pub(crate) fn default_service_name() -> String {
    "hostelcart-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
