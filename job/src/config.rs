//! Configuration management for the booking lifecycle job.
//!
//! Loads configuration from environment variables. Unset optional values
//! fall back to defaults; values that are set but unparseable are errors.

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration failures. All of them are fatal for the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("Invalid value for {name}: {value:?}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },
}

/// Job configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Booking store connection
    pub database: DatabaseConfig,
    /// Settlement service
    pub settlement: SettlementConfig,
    /// Meeting-link provider; `None` disables link backfill
    pub meeting_link: Option<MeetingLinkConfig>,
    /// Budget for each reminder send, in milliseconds
    pub notification_timeout_ms: u64,
    /// Take the advisory run lock before the pass
    pub advisory_lock: bool,
    /// Lock key and log field
    pub job_name: String,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

/// Settlement service configuration
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Base URL
    pub url: String,
    /// Bearer token
    pub api_key: Option<String>,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
}

/// Meeting-link provider configuration
#[derive(Debug, Clone)]
pub struct MeetingLinkConfig {
    /// Endpoint URL
    pub url: String,
    /// Bearer token
    pub api_key: Option<String>,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
}

impl JobConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or any
    /// variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or any
    /// variable is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        let meeting_link = match vars.optional("MEETING_LINK_URL") {
            Some(url) => Some(MeetingLinkConfig {
                url,
                api_key: vars.optional("MEETING_LINK_API_KEY"),
                timeout_ms: vars.parse_or("MEETING_LINK_TIMEOUT_MS", 10_000)?,
            }),
            None => None,
        };

        Ok(Self {
            database: DatabaseConfig {
                url: vars.required("DATABASE_URL")?,
                max_connections: vars.parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
                connect_timeout: vars.parse_or("DATABASE_CONNECT_TIMEOUT", 10)?,
            },
            settlement: SettlementConfig {
                url: vars.required("SETTLEMENT_URL")?,
                api_key: vars.optional("SETTLEMENT_API_KEY"),
                timeout_ms: vars.parse_or("SETTLEMENT_TIMEOUT_MS", 30_000)?,
            },
            meeting_link,
            notification_timeout_ms: vars.parse_or("NOTIFICATION_TIMEOUT_MS", 5_000)?,
            advisory_lock: vars.flag("JOB_ADVISORY_LOCK")?,
            job_name: vars
                .optional("JOB_NAME")
                .unwrap_or_else(|| "booking-lifecycle".to_string()),
        })
    }

    /// Pool connect timeout.
    #[must_use]
    pub const fn database_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.database.connect_timeout)
    }

    /// Settlement call budget.
    #[must_use]
    pub const fn settlement_timeout(&self) -> Duration {
        Duration::from_millis(self.settlement.timeout_ms)
    }

    /// Reminder send budget.
    #[must_use]
    pub const fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }
}

impl MeetingLinkConfig {
    /// Provisioning call budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

struct Vars<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn parse_or<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        let Some(value) = self.optional(name) else {
            return Ok(default);
        };
        let parsed = value.trim().parse();
        parsed.map_err(|_| ConfigError::Invalid { name, value })
    }

    fn flag(&self, name: &'static str) -> Result<bool, ConfigError> {
        let Some(value) = self.optional(name) else {
            return Ok(false);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        }
    }
}
