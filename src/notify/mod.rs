//! Rendering and delivery of "new results" messages.
//!
//! The scheduler gets a [`Renderer`] and a [`Notifier`] at construction.
//! Delivery is fire-and-forget from its side: errors are logged, never
//! retried.

mod log;
mod render;
mod webhook;

pub use self::log::LogNotifier;
pub use render::HtmlRenderer;
pub use webhook::WebhookNotifier;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::ClassSnapshot;

pub const DEFAULT_SUBJECT: &str = "You have new results!";

/// Builds the message body for a set of changed classes.
pub trait Renderer: Send + Sync {
    fn render(&self, user_name: &str, changed: &[ClassSnapshot]) -> String;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<()>;
}
