use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::scraper::site;

/// Where and how to query the results site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Results page the form is posted to
    pub url: String,

    /// User agent sent with every request
    pub user_agent: String,

    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: site::DEFAULT_URL.to_string(),
            user_agent: site::DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
        }
    }
}

impl SiteConfig {
    /// Get the request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
