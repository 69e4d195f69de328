use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ClassSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn new(email: impl Into<String>, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}

/// Permanent code and personal identification number used to log into the
/// results site. `Debug` never prints either value.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub code: String,
    pub nip: String,
}

impl Credentials {
    pub fn new(code: impl Into<String>, nip: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            nip: nip.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty() || self.nip.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("code", &"<redacted>")
            .field("nip", &"<redacted>")
            .finish()
    }
}

/// Per-user crawler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlerConfig {
    pub user_id: String,
    pub enabled: bool,
    pub credentials: Credentials,
    pub notification_email: String,
}

impl CrawlerConfig {
    pub fn new(user_id: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            user_id: user_id.into(),
            enabled: true,
            credentials,
            notification_email: String::new(),
        }
    }

    pub fn notification_address(&self) -> Option<&str> {
        let address = self.notification_email.trim();
        (!address.is_empty()).then_some(address)
    }
}

/// Persisted results of one user, organized by class.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserResults {
    pub user_id: String,
    pub last_update: Option<DateTime<Utc>>,
    pub classes: Vec<ClassSnapshot>,
}

impl UserResults {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            last_update: None,
            classes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials::new("ABCD12345678", "98765");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("ABCD12345678"));
        assert!(!printed.contains("98765"));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user = User::new("student@example.com", "", "");
        assert_eq!(user.display_name(), "student@example.com");

        let user = User::new("student@example.com", "Ada", "Lovelace");
        assert_eq!(user.display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_notification_address_blank_is_none() {
        let mut config = CrawlerConfig::new("u1", Credentials::default());
        assert_eq!(config.notification_address(), None);

        config.notification_email = "  ".into();
        assert_eq!(config.notification_address(), None);

        config.notification_email = "me@example.com".into();
        assert_eq!(config.notification_address(), Some("me@example.com"));
    }
}
