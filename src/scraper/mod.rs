//! Scraping engine for the university results site.
//!
//! # Architecture
//!
//! ```text
//! CrawlJob → ScrapingAgent → (one POST per class) → ResultExtractor → ClassOutcome
//! ```
//!
//! [`site`] holds the site's form fields and text markers, [`ColumnLayout`]
//! maps the varying table widths to result columns, [`ResultExtractor`]
//! turns one page into a snapshot or a classified error, and
//! [`ScrapingAgent`] fans out the per-class requests of a job.

mod agent;
mod config;
mod extractor;
mod layout;
pub mod site;

pub use agent::ScrapingAgent;
pub use config::SiteConfig;
pub use extractor::ResultExtractor;
pub use layout::ColumnLayout;

use async_trait::async_trait;

use crate::domain::ClassOutcome;
use crate::scheduler::CrawlJob;

/// Something that can crawl every class of a job.
///
/// Returns exactly one outcome per class of the job, in class order. A
/// failing class never suppresses the others, and nothing is retried.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn run(&self, job: &CrawlJob) -> Vec<ClassOutcome>;
}
