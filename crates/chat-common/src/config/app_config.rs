//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub presence: PresenceConfig,
    pub feed: FeedConfig,
    pub retry: RetryConfig,
    /// Identity used by the in-memory auth provider
    #[serde(default)]
    pub identity: Option<IdentityConfig>,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            _ => Err(ConfigError::InvalidValue("APP_ENV", s.to_string())),
        }
    }
}

/// Presence heartbeat and staleness settings
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_active_threshold_secs")]
    pub active_threshold_secs: u64,
}

impl PresenceConfig {
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    #[must_use]
    pub fn active_threshold(&self) -> Duration {
        Duration::from_secs(self.active_threshold_secs)
    }
}

/// Message feed settings
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Bounded retry for backend writes
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub backoff_ms: u64,
}

impl RetryConfig {
    #[must_use]
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Identity handed out by the in-memory auth provider
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

// Default value functions
fn default_app_name() -> String {
    "chat-client".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_heartbeat_secs() -> u64 {
    5
}

fn default_active_threshold_secs() -> u64 {
    30
}

fn default_page_size() -> usize {
    30
}

fn default_retry_attempts() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    200
}

const MAX_PAGE_SIZE: usize = 100;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: default_env(),
            },
            presence: PresenceConfig {
                heartbeat_interval_secs: default_heartbeat_secs(),
                active_threshold_secs: default_active_threshold_secs(),
            },
            feed: FeedConfig {
                page_size: default_page_size(),
            },
            retry: RetryConfig {
                max_attempts: default_retry_attempts(),
                backoff_ms: default_retry_backoff_ms(),
            },
            identity: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is present but malformed, or if the
    /// presence timings are inconsistent
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .map(|s| s.parse::<Environment>())
                    .transpose()?
                    .unwrap_or_default(),
            },
            presence: PresenceConfig {
                heartbeat_interval_secs: parse_var(
                    &lookup,
                    "PRESENCE_HEARTBEAT_SECS",
                    default_heartbeat_secs(),
                )?,
                active_threshold_secs: parse_var(
                    &lookup,
                    "PRESENCE_ACTIVE_THRESHOLD_SECS",
                    default_active_threshold_secs(),
                )?,
            },
            feed: FeedConfig {
                page_size: parse_var::<usize, _>(&lookup, "FEED_PAGE_SIZE", default_page_size())?
                    .clamp(1, MAX_PAGE_SIZE),
            },
            retry: RetryConfig {
                max_attempts: parse_var::<u32, _>(
                    &lookup,
                    "WRITE_RETRY_ATTEMPTS",
                    default_retry_attempts(),
                )?
                .max(1),
                backoff_ms: parse_var(&lookup, "WRITE_RETRY_BACKOFF_MS", default_retry_backoff_ms())?,
            },
            identity: identity_from(&lookup)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        let presence = &self.presence;
        if presence.heartbeat_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "PRESENCE_HEARTBEAT_SECS",
                "must be greater than zero".to_string(),
            ));
        }
        // The owner would flap to inactive between two beats
        if presence.heartbeat_interval_secs >= presence.active_threshold_secs {
            return Err(ConfigError::InvalidValue(
                "PRESENCE_HEARTBEAT_SECS",
                format!(
                    "{}s must be shorter than the {}s active threshold",
                    presence.heartbeat_interval_secs, presence.active_threshold_secs
                ),
            ));
        }
        Ok(())
    }

    /// The configured identity, required by the terminal client
    pub fn require_identity(&self) -> Result<&IdentityConfig, ConfigError> {
        self.identity
            .as_ref()
            .ok_or(ConfigError::MissingVar("CHAT_USER_ID"))
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(default),
    }
}

fn identity_from<F>(lookup: &F) -> Result<Option<IdentityConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match (lookup("CHAT_USER_ID"), lookup("CHAT_USER_EMAIL")) {
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::MissingVar("CHAT_USER_EMAIL")),
        (None, Some(_)) => Err(ConfigError::MissingVar("CHAT_USER_ID")),
        (Some(user_id), Some(email)) => Ok(Some(IdentityConfig {
            user_id,
            email,
            avatar_url: lookup("CHAT_USER_AVATAR").filter(|s| !s.is_empty()),
        })),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
