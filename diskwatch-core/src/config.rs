//! Configuration management
//!
//! Handles:
//! - Telegram credentials (validated before anything may run)
//! - Check schedule and host label
//! - Retry policy
//! - Health source command
//!
//! A missing file is replaced by a template and startup stops until the
//! placeholders are filled in.

use crate::delivery::telegram::DEFAULT_API_BASE;
use crate::delivery::RetryPolicy;
use crate::error::ConfigError;
use crate::host::HostIdentity;
use crate::orchestrator::MAX_CHECK_INTERVAL;
use crate::source::CommandSource;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const TOKEN_PLACEHOLDER: &str = "YOUR_TOKEN_HERE";
pub const CHAT_ID_PLACEHOLDER: &str = "YOUR_CHAT_ID_HERE";

const TEMPLATE: &str = r#"# DiskWatch configuration

[telegram]
token = "YOUR_TOKEN_HERE"
chat_id = "YOUR_CHAT_ID_HERE"
# api_base = "https://api.telegram.org"
# request_timeout_secs = 10

[monitor]
# check_interval_secs = 3600
# check_on_start = false
# host_label = "file-server-01"

[delivery]
# max_attempts = 5
# initial_delay_secs = 5
# backoff_factor = 3

# [source]
# program = "powershell"
# args = ["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command", "..."]
# timeout_secs = 120
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub monitor: ScheduleConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub check_interval_secs: u64,
    pub check_on_start: bool,
    pub host_label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub max_attempts: u32,
    pub initial_delay_secs: u64,
    pub backoff_factor: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 3600,
            check_on_start: false,
            host_label: None,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_delay_secs: policy.initial_delay.as_secs(),
            backoff_factor: policy.factor,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        let source = CommandSource::powershell_probe();
        Self {
            program: source.program().to_string(),
            args: source.args().to_vec(),
            timeout_secs: source.timeout().as_secs(),
        }
    }
}

/// Bot token and chat id that passed validation
#[derive(Clone)]
pub struct Credentials {
    token: String,
    chat_id: String,
}

impl Credentials {
    pub fn new(token: &str, chat_id: &str) -> Result<Self, ConfigError> {
        let token = token.trim();
        let chat_id = chat_id.trim();

        if token.is_empty() {
            return Err(ConfigError::MissingSecret("telegram.token"));
        }
        if token == TOKEN_PLACEHOLDER {
            return Err(ConfigError::PlaceholderSecret("telegram.token"));
        }
        if chat_id.is_empty() {
            return Err(ConfigError::MissingSecret("telegram.chat_id"));
        }
        if chat_id == CHAT_ID_PLACEHOLDER {
            return Err(ConfigError::PlaceholderSecret("telegram.chat_id"));
        }

        Ok(Self {
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl MonitorConfig {
    /// Default location: `<config dir>/diskwatch/config.toml`
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push("diskwatch");
        path.push("config.toml");
        Ok(path)
    }

    /// Load and validate; writes a template when the file does not exist
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::write_template(path).await?;
            return Err(ConfigError::TemplateCreated {
                path: path.to_path_buf(),
            });
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config = Self::from_toml(&content, path)?;
        config.validate()?;

        info!("Configuration loaded successfully from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    async fn write_template(path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(path, TEMPLATE).await.map_err(write_err)?;

        info!("Config file not found, template created at {}", path.display());
        Ok(())
    }

    /// Everything the core needs before it may start monitoring
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.credentials()?;

        if self.monitor.check_interval_secs == 0 {
            return Err(invalid("monitor.check_interval_secs", "must be greater than zero"));
        }
        if self.check_interval() > MAX_CHECK_INTERVAL {
            return Err(invalid("monitor.check_interval_secs", "must not exceed 30 days"));
        }
        if self.telegram.request_timeout_secs == 0 {
            return Err(invalid("telegram.request_timeout_secs", "must be greater than zero"));
        }
        if self.delivery.max_attempts == 0 {
            return Err(invalid("delivery.max_attempts", "at least one attempt is required"));
        }
        if self.source.program.trim().is_empty() {
            return Err(invalid("source.program", "must name an executable"));
        }
        if self.source.timeout_secs == 0 {
            return Err(invalid("source.timeout_secs", "must be greater than zero"));
        }
        Ok(())
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        Credentials::new(&self.telegram.token, &self.telegram.chat_id)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.check_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.delivery.max_attempts,
            initial_delay: Duration::from_secs(self.delivery.initial_delay_secs),
            factor: self.delivery.backoff_factor,
        }
    }

    pub fn host_identity(&self) -> HostIdentity {
        HostIdentity::from_label(self.monitor.host_label.clone())
    }

    pub fn health_source(&self) -> CommandSource {
        CommandSource::new(
            self.source.program.clone(),
            self.source.args.clone(),
            Duration::from_secs(self.source.timeout_secs),
        )
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
