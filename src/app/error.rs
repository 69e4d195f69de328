use thiserror::Error;

use crate::config::ConfigError;
use crate::scheduler::SchedulerError;

#[derive(Error, Debug)]
pub enum GradewatchError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Credential encryption error: {0}")]
    Crypto(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GradewatchError>;
