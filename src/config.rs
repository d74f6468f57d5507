//! Configuration for the audience agent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default collection domain.
pub const DEFAULT_DOMAIN: &str = "crwdcntrl.net";

/// Default URL scheme.
pub const DEFAULT_PROTOCOL: &str = "https";

/// Endpoint addressing for one client account.
///
/// Changing any field starts a new session; the dispatch worker performs the
/// reset when it applies a new `ClientConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    pub domain: String,
    pub protocol: String,
}

impl ClientConfig {
    /// Client config with the default domain and protocol.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            domain: DEFAULT_DOMAIN.to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
        }
    }

    /// Build and validate a config with explicit domain and protocol.
    pub fn with_endpoint(
        domain: impl Into<String>,
        protocol: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            client_id: client_id.into(),
            domain: domain.into(),
            protocol: protocol.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// True once a non-empty client id is set.
    pub fn is_initialized(&self) -> bool {
        !self.client_id.is_empty()
    }

    /// Check domain and protocol. The client id may be empty, which leaves
    /// the agent uninitialized.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain.is_empty() {
            return Err(ConfigError::Invalid("domain must not be empty".to_string()));
        }
        if self.domain.contains('/') || self.domain.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "domain '{}' must be a bare host name",
                self.domain
            )));
        }
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::Invalid(format!(
                "protocol '{}' must be http or https",
                self.protocol
            )));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// Persistent settings for the agent binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Client account id; unset until `initialize`
    pub client_id: Option<String>,

    /// Collection domain
    pub domain: String,

    /// URL scheme
    pub protocol: String,

    /// Whether the user consented to tracking
    pub tracking_enabled: bool,

    /// Transport timeout per request
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,

    /// Interval between automatic flushes
    #[serde(with = "duration_serde")]
    pub flush_interval: Duration,

    /// Path for storing dispatch statistics
    pub data_path: PathBuf,
}

impl Default for AgentSettings {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("audience-agent");

        Self {
            client_id: None,
            domain: DEFAULT_DOMAIN.to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            tracking_enabled: true,
            request_timeout: crate::transport::DEFAULT_TIMEOUT,
            flush_interval: Duration::from_secs(30),
            data_path: data_dir,
        }
    }
}

impl AgentSettings {
    /// Load settings from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`, falling back to defaults when it is missing.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
            let settings: AgentSettings =
                serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
            Ok(settings)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("audience-agent")
            .join("config.json")
    }

    /// Client config described by these settings, validated.
    ///
    /// A command-line client id overrides the stored one.
    pub fn client_config(&self, client_id: Option<&str>) -> Result<ClientConfig, ConfigError> {
        let client_id = client_id
            .or(self.client_id.as_deref())
            .unwrap_or_default();
        ClientConfig::with_endpoint(&self.domain, &self.protocol, client_id)
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
