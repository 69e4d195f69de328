use async_trait::async_trait;
use tracing::{debug, info};

use crate::app::Result;
use crate::notify::Notifier;

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<()> {
        info!(to = %address, subject = %subject, bytes = body.len(), "Notification");
        debug!("{}", body);
        Ok(())
    }
}
