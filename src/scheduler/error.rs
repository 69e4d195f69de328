use thiserror::Error;

/// Why a user could not be queued or waited on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scheduler is stopped")]
    Stopped,

    #[error("Scheduler was already started")]
    AlreadyStarted,

    #[error("Job was dropped before a worker finished it")]
    DoneSignalDropped,

    #[error("No crawler configured for user {0}")]
    NotConfigured(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<crate::app::GradewatchError> for SchedulerError {
    fn from(e: crate::app::GradewatchError) -> Self {
        SchedulerError::Store(e.to_string())
    }
}
