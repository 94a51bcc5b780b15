//! Configuration types for the flare reconciler
//!
//! Two layers live here:
//! - [`Config`]: the persisted identity of the managed record plus
//!   credentials, loaded once from `config.yml` and read-only afterwards.
//! - [`ReconcileConfig`]: loop tunables with named defaults, so tests can
//!   substitute short intervals.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Config file read by the daemon, relative to its working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// Interval between reconcile ticks (60 seconds)
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(60);

/// TTL for records created by the reconciler (60 seconds)
pub const DEFAULT_RECORD_TTL: u32 = 60;

/// Capacity of the reconciler's event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 100;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main flare configuration
///
/// Mirrors `config.yml`:
///
/// ```yaml
/// key: "<api token>"
/// account: "<account id>"
/// zone: "<zone id>"
/// record: "home.example.com"
/// log_level: "info" # optional
/// ```
///
/// # Security
///
/// The Debug implementation does NOT expose the API key.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// API token sent as a bearer credential
    #[serde(rename = "key", default)]
    pub api_key: String,

    /// Account identifier
    #[serde(rename = "account", default)]
    pub account_id: String,

    /// Zone identifier the record lives in
    #[serde(rename = "zone", default)]
    pub zone_id: String,

    /// Fully qualified record name (e.g. "home.example.com")
    #[serde(rename = "record", default)]
    pub record_name: String,

    /// Max tracing level for the daemon
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<REDACTED>")
            .field("account_id", &self.account_id)
            .field("zone_id", &self.zone_id)
            .field("record_name", &self.record_name)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Create a configuration from its four required fields
    pub fn new(
        api_key: impl Into<String>,
        account_id: impl Into<String>,
        zone_id: impl Into<String>,
        record_name: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            account_id: account_id.into(),
            zone_id: zone_id.into(),
            record_name: record_name.into(),
            log_level: default_log_level(),
        }
    }

    /// Load and validate the configuration file at `path`
    ///
    /// # Returns
    ///
    /// - `Ok(Config)`: A fully populated configuration
    /// - `Err(Error::Io)`: The file could not be read
    /// - `Err(Error::Yaml)`: The file is not a valid YAML document
    /// - `Err(Error::Config)`: A required field is missing or empty
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&raw)
    }

    /// Parse and validate a configuration from YAML text
    pub fn from_yaml(raw: &str) -> crate::Result<Self> {
        let config: Config = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Fields are checked in a fixed order (key, account, zone, record) and
    /// only the first failure is reported.
    pub fn validate(&self) -> crate::Result<()> {
        if self.api_key.is_empty() {
            return Err(crate::Error::config("missing key"));
        }
        if self.account_id.is_empty() {
            return Err(crate::Error::config("missing account"));
        }
        if self.zone_id.is_empty() {
            return Err(crate::Error::config("missing zone"));
        }
        if self.record_name.is_empty() {
            return Err(crate::Error::config("missing record"));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(crate::Error::config(format!(
                "invalid log_level '{}' (valid: {})",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Reconciler tunables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Name of the managed A record
    pub record_name: String,

    /// TTL applied to newly created records
    pub ttl: u32,

    /// Delay between reconcile ticks
    pub interval: Duration,

    /// Capacity of the event channel
    ///
    /// When full, new events are dropped with a warning log.
    pub event_channel_capacity: usize,
}

impl ReconcileConfig {
    /// Create tunables for `record_name` with the default constants
    pub fn new(record_name: impl Into<String>) -> Self {
        Self {
            record_name: record_name.into(),
            ttl: DEFAULT_RECORD_TTL,
            interval: DEFAULT_RECONCILE_INTERVAL,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    /// Set the TTL for created records
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the tick interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the event channel capacity
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Validate the tunables
    pub fn validate(&self) -> crate::Result<()> {
        if self.record_name.is_empty() {
            return Err(crate::Error::config("missing record"));
        }
        if self.interval.is_zero() {
            return Err(crate::Error::config("reconcile interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl From<&Config> for ReconcileConfig {
    fn from(config: &Config) -> Self {
        Self::new(config.record_name.clone())
    }
}
