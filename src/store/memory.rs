use std::collections::HashMap;
use std::sync::RwLock;

use crate::app::{GradewatchError, Result};
use crate::domain::{CrawlerConfig, User, UserResults};
use crate::store::{CredentialStore, ResultsStore, UserStore};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    configs: HashMap<String, CrawlerConfig>,
    results: HashMap<String, UserResults>,
}

/// Map-backed store for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| GradewatchError::Other(e.to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| GradewatchError::Other(e.to_string()))
    }
}

impl UserStore for MemoryStore {
    fn add_user(&self, user: &User) -> Result<()> {
        self.write()?.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<_> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }
}

impl CredentialStore for MemoryStore {
    fn get_crawler_config(&self, user_id: &str) -> Result<Option<CrawlerConfig>> {
        Ok(self.read()?.configs.get(user_id).cloned())
    }

    fn update_crawler_config(&self, config: &CrawlerConfig) -> Result<()> {
        self.write()?
            .configs
            .insert(config.user_id.clone(), config.clone());
        Ok(())
    }
}

impl ResultsStore for MemoryStore {
    fn get_results(&self, user_id: &str) -> Result<UserResults> {
        Ok(self
            .read()?
            .results
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserResults::new(user_id)))
    }

    fn update_results(&self, results: &UserResults) -> Result<()> {
        self.write()?
            .results
            .insert(results.user_id.clone(), results.clone());
        Ok(())
    }
}
