use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{GradewatchError, Result};
use crate::domain::{ClassSnapshot, CrawlerConfig, Credentials, User, UserResults};
use crate::store::{CredentialCipher, CredentialStore, ResultsStore, UserStore};

/// Credentials are encrypted with `cipher` before they reach the database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    cipher: CredentialCipher,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P, cipher: CredentialCipher) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
            cipher,
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            cipher: CredentialCipher::ephemeral(),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| GradewatchError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            GradewatchError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }
}

impl UserStore for SqliteStore {
    fn add_user(&self, user: &User) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (id, email, first_name, last_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.email,
                user.first_name,
                user.last_name,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        let user = conn
            .query_row(
                "SELECT id, email, first_name, last_name FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        first_name: row.get(2)?,
                        last_name: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, email, first_name, last_name FROM users ORDER BY email")?;

        let users = stmt
            .query_map([], |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    first_name: row.get(2)?,
                    last_name: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }
}

impl CredentialStore for SqliteStore {
    fn get_crawler_config(&self, user_id: &str) -> Result<Option<CrawlerConfig>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT user_id, enabled, code, nip, notification_email
                 FROM crawler_configs WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        CrawlerConfig {
                            user_id: row.get(0)?,
                            enabled: row.get(1)?,
                            credentials: Credentials::default(),
                            notification_email: row.get(4)?,
                        },
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((mut config, code, nip)) = row else {
            return Ok(None);
        };
        config.credentials = Credentials {
            code: self.cipher.decrypt(&code)?,
            nip: self.cipher.decrypt(&nip)?,
        };
        Ok(Some(config))
    }

    fn update_crawler_config(&self, config: &CrawlerConfig) -> Result<()> {
        let code = self.cipher.encrypt(&config.credentials.code)?;
        let nip = self.cipher.encrypt(&config.credentials.nip)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO crawler_configs (user_id, enabled, code, nip, notification_email)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
                enabled = excluded.enabled,
                code = excluded.code,
                nip = excluded.nip,
                notification_email = excluded.notification_email",
            params![
                config.user_id,
                config.enabled,
                code,
                nip,
                config.notification_email
            ],
        )?;
        Ok(())
    }
}

impl ResultsStore for SqliteStore {
    fn get_results(&self, user_id: &str) -> Result<UserResults> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT last_update, classes FROM user_results WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((last_update, classes)) = row else {
            return Ok(UserResults::new(user_id));
        };

        let classes: Vec<ClassSnapshot> = serde_json::from_str(&classes)?;
        Ok(UserResults {
            user_id: user_id.to_string(),
            last_update: last_update.and_then(|s| Self::parse_datetime(&s)),
            classes,
        })
    }

    fn update_results(&self, results: &UserResults) -> Result<()> {
        let classes = serde_json::to_string(&results.classes)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO user_results (user_id, last_update, classes)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                last_update = excluded.last_update,
                classes = excluded.classes",
            params![
                results.user_id,
                results.last_update.map(|t| t.to_rfc3339()),
                classes
            ],
        )?;
        Ok(())
    }
}
