use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{GradewatchError, Result};
use crate::config::{Config, ConfigError, NotifierKind};
use crate::fetcher::{HttpTransport, Transport};
use crate::notify::{HtmlRenderer, LogNotifier, Notifier, Renderer, WebhookNotifier};
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::scraper::{Agent, ScrapingAgent};
use crate::store::{CredentialCipher, MemoryStore, SqliteStore, Store};

pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub transport: Arc<dyn Transport + Send + Sync>,
    pub notifier: Arc<dyn Notifier>,
    pub renderer: Arc<dyn Renderer>,
}

impl AppContext {
    /// Wire everything up against the SQLite store named in `config`.
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match &config.store.path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };
        let cipher = match (&config.store.credential_key, &config.store.key_file) {
            (Some(key), _) => CredentialCipher::from_hex(key)?,
            (None, Some(path)) => CredentialCipher::load_or_create(path)?,
            (None, None) => CredentialCipher::load_or_create(&db_path.with_extension("key"))?,
        };
        let store: Arc<dyn Store> = Arc::new(SqliteStore::new(&db_path, cipher)?);
        Self::with_store(config, store)
    }

    /// Same wiring over a `MemoryStore` that is lost on exit.
    pub fn in_memory(config: Config) -> Result<Self> {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: Config, store: Arc<dyn Store>) -> Result<Self> {
        let transport: Arc<dyn Transport + Send + Sync> = Arc::new(HttpTransport::new(&config.site));
        let notifier: Arc<dyn Notifier> = match config.notifier.kind {
            NotifierKind::Log => Arc::new(LogNotifier::new()),
            NotifierKind::Webhook => {
                let url = config.notifier.webhook_url.clone().ok_or(ConfigError::Invalid {
                    field: "notifier.webhook_url",
                    message: "required when kind = \"webhook\"".to_string(),
                })?;
                Arc::new(WebhookNotifier::new(url))
            }
        };

        Ok(Self {
            config,
            store,
            transport,
            notifier,
            renderer: Arc::new(HtmlRenderer::new()),
        })
    }

    /// A scheduler with one scraping agent per configured worker.
    pub fn scheduler(&self) -> Result<Arc<Scheduler>> {
        let agents = (0..self.config.scheduler.workers.max(1))
            .map(|_| {
                Arc::new(ScrapingAgent::new(
                    self.transport.clone(),
                    self.config.site.clone(),
                )) as Arc<dyn Agent>
            })
            .collect();

        Ok(Arc::new(Scheduler::new(SchedulerConfig {
            agents,
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            renderer: self.renderer.clone(),
            options: self.config.scheduler_options()?,
        })))
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| GradewatchError::Other("Could not find data directory".into()))?;
        let gradewatch_dir = data_dir.join("gradewatch");
        std::fs::create_dir_all(&gradewatch_dir)?;
        Ok(gradewatch_dir.join("gradewatch.db"))
    }
}
