use thiserror::Error;

use crate::domain::ClassSnapshot;

/// Why one class could not be crawled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrawlError {
    #[error("No results for this class")]
    NoResults,

    #[error("Invalid year/class/group")]
    InvalidClassGroup,

    #[error("Invalid code or nip")]
    InvalidCredentials,

    #[error("Not listed for this class")]
    NotRegistered,

    #[error("Unknown table layout ({0} header columns)")]
    UnknownLayout(usize),

    #[error("Unknown error")]
    Unknown,

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for CrawlError {
    fn from(e: reqwest::Error) -> Self {
        CrawlError::Transport(e.to_string())
    }
}

/// Result of one crawl attempt for the class at `class_index` of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassOutcome {
    pub class_index: usize,
    pub result: Result<ClassSnapshot, CrawlError>,
}

impl ClassOutcome {
    pub fn success(class_index: usize, snapshot: ClassSnapshot) -> Self {
        Self {
            class_index,
            result: Ok(snapshot),
        }
    }

    pub fn failure(class_index: usize, error: CrawlError) -> Self {
        Self {
            class_index,
            result: Err(error),
        }
    }

    pub fn snapshot(&self) -> Option<&ClassSnapshot> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&CrawlError> {
        self.result.as_ref().err()
    }
}
