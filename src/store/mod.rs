pub mod cipher;
pub mod memory;
pub mod sqlite;

use crate::app::Result;
use crate::domain::{CrawlerConfig, User, UserResults};

pub use cipher::CredentialCipher;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub trait UserStore {
    fn add_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;
}

/// Per-user crawler settings. Stores that persist credentials encrypt them,
/// and reads hand them back decrypted.
pub trait CredentialStore {
    fn get_crawler_config(&self, user_id: &str) -> Result<Option<CrawlerConfig>>;
    fn update_crawler_config(&self, config: &CrawlerConfig) -> Result<()>;
}

pub trait ResultsStore {
    /// A user with nothing stored yet gets an empty record with no timestamp.
    fn get_results(&self, user_id: &str) -> Result<UserResults>;
    /// Replaces the whole record.
    fn update_results(&self, results: &UserResults) -> Result<()>;
}

/// Everything the scheduler needs from persistence.
pub trait Store: UserStore + CredentialStore + ResultsStore + Send + Sync {}

impl<T: UserStore + CredentialStore + ResultsStore + Send + Sync> Store for T {}
