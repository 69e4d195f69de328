use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// In-memory record of when each user was last queued.
///
/// Seeded from the stored refresh timestamps and updated on every enqueue,
/// so a polling tick does not read each user's results. It is rebuilt from
/// the store on restart.
#[derive(Debug, Default)]
pub struct RefreshSchedule {
    last_checked: HashMap<String, Option<DateTime<Utc>>>,
}

impl RefreshSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.last_checked.contains_key(user_id)
    }

    /// Record a user's stored timestamp unless the user is already known.
    pub fn seed(&mut self, user_id: &str, last_update: Option<DateTime<Utc>>) {
        self.last_checked
            .entry(user_id.to_string())
            .or_insert(last_update);
    }

    pub fn record(&mut self, user_id: &str, at: DateTime<Utc>) {
        self.last_checked.insert(user_id.to_string(), Some(at));
    }

    pub fn last_checked(&self, user_id: &str) -> Option<DateTime<Utc>> {
        self.last_checked.get(user_id).copied().flatten()
    }

    /// A user never checked is due. A clock that moved backwards is not.
    pub fn is_due(&self, user_id: &str, now: DateTime<Utc>, interval: Duration) -> bool {
        match self.last_checked(user_id) {
            None => true,
            Some(last) => (now - last).to_std().is_ok_and(|elapsed| elapsed >= interval),
        }
    }

    pub fn len(&self) -> usize {
        self.last_checked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_checked.is_empty()
    }
}
