//! Configuration management for gradewatch.
//!
//! Configuration is read from `~/.config/gradewatch/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::daemon::DaemonConfig;
use crate::notify::DEFAULT_SUBJECT;
use crate::scheduler::SchedulerOptions;
use crate::scraper::SiteConfig;
use crate::store::CredentialCipher;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerSettings,
    pub site: SiteConfig,
    pub store: StoreSettings,
    pub notifier: NotifierSettings,
}

/// Worker pool and polling settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Number of scraping workers (default: 10)
    pub workers: usize,
    /// Work queue capacity; 0 means the worker count
    pub queue_capacity: usize,
    /// How often the polling loop looks for due users
    pub check_interval: String,
    /// Minimum time between two refreshes of the same user
    pub refresh_interval: String,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            workers: 10,
            queue_capacity: 0,
            check_interval: "30s".to_string(),
            refresh_interval: "30m".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite database file (default: `<data dir>/gradewatch/gradewatch.db`)
    pub path: Option<PathBuf>,
    /// Hex AES-256 key for stored credentials. Takes precedence over `key_file`.
    pub credential_key: Option<String>,
    /// Key file, created on first use (default: the database path with a `.key` extension)
    pub key_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    #[default]
    Log,
    Webhook,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifierSettings {
    pub kind: NotifierKind,
    pub webhook_url: Option<String>,
    pub subject: String,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            kind: NotifierKind::Log,
            webhook_url: None,
            subject: DEFAULT_SUBJECT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/gradewatch/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("gradewatch").join("config.toml"))
    }

    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler_options()?;
        if self.scheduler.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "scheduler.workers",
                message: "must be at least 1".to_string(),
            });
        }
        if let Some(key) = &self.store.credential_key {
            CredentialCipher::from_hex(key).map_err(|e| ConfigError::Invalid {
                field: "store.credential_key",
                message: e.to_string(),
            })?;
        }
        if self.notifier.kind == NotifierKind::Webhook && self.notifier.webhook_url.is_none() {
            return Err(ConfigError::Invalid {
                field: "notifier.webhook_url",
                message: "required when kind = \"webhook\"".to_string(),
            });
        }
        Ok(())
    }

    /// Scheduler timing with intervals parsed.
    pub fn scheduler_options(&self) -> Result<SchedulerOptions, ConfigError> {
        Ok(SchedulerOptions {
            queue_capacity: self.scheduler.queue_capacity.max(self.scheduler.workers),
            check_interval: parse_duration("scheduler.check_interval", &self.scheduler.check_interval)?,
            refresh_interval: parse_duration(
                "scheduler.refresh_interval",
                &self.scheduler.refresh_interval,
            )?,
            subject: self.notifier.subject.clone(),
        })
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# gradewatch configuration
#
# Intervals accept "30s", "5m", "1h", "1d" or a number of seconds.

[scheduler]
# Number of scraping workers
workers = 10

# Work queue capacity (0 = same as workers; smaller values are raised)
queue_capacity = 0

# How often to look for users due for a refresh
check_interval = "30s"

# Minimum time between two refreshes of the same user
refresh_interval = "30m"

[site]
# Results page the login form is posted to
url = "https://www-s.websysinfo.uqam.ca/etudiant/drew00da"

# Request timeout in seconds
timeout_secs = 30

[store]
# SQLite database file (defaults to the platform data directory)
# path = "/var/lib/gradewatch/gradewatch.db"

# Stored credentials are encrypted with AES-256. Give the key as 64 hex
# characters, or leave it unset to use a key file that is created on first run.
# credential_key = "..."
# key_file = "/var/lib/gradewatch/gradewatch.key"

[notifier]
# "log" writes notifications to the log, "webhook" posts them as JSON
kind = "log"
# webhook_url = "https://mail-relay.example.com/send"
subject = "You have new results!"
"##
        .to_string()
    }
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    DaemonConfig::parse_interval(value)
        .map(Duration::from_secs)
        .map_err(|message| ConfigError::Invalid { field, message })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}
