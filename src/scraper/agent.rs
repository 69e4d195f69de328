use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use crate::domain::{ClassOutcome, ClassSpec, CrawlError};
use crate::fetcher::{FormRequest, Transport};
use crate::scheduler::CrawlJob;
use crate::scraper::{site, Agent, ResultExtractor, SiteConfig};

/// Queries the results site for every class of a job.
pub struct ScrapingAgent {
    transport: Arc<dyn Transport + Send + Sync>,
    extractor: ResultExtractor,
    site: SiteConfig,
}

impl ScrapingAgent {
    pub fn new(transport: Arc<dyn Transport + Send + Sync>, site: SiteConfig) -> Self {
        Self {
            transport,
            extractor: ResultExtractor::new(),
            site,
        }
    }

    fn build_request(&self, job: &CrawlJob, class: &ClassSpec) -> FormRequest {
        FormRequest {
            url: self.site.url.clone(),
            user_agent: self.site.user_agent.clone(),
            fields: vec![
                (site::FIELD_CODE, job.credentials.code.clone()),
                (site::FIELD_NIP, job.credentials.nip.clone()),
                (site::FIELD_CLASS, class.name.clone()),
                (site::FIELD_GROUP, class.group.clone()),
                (site::FIELD_YEAR, class.year.clone()),
            ],
        }
    }

    async fn run_class(&self, job: &CrawlJob, class_index: usize, class: &ClassSpec) -> ClassOutcome {
        debug!("Sending request for {}", class.name);
        let response = match self.transport.execute(self.build_request(job, class)).await {
            Ok(response) => response,
            Err(e) => return ClassOutcome::failure(class_index, CrawlError::Transport(e.to_string())),
        };

        debug!("Parsing response for {}", class.name);
        let result = match self.extractor.extract(class, &response.body) {
            Err(CrawlError::Unknown) if !response.is_success() => Err(CrawlError::Transport(
                format!("HTTP status {}", response.status),
            )),
            other => other,
        };

        ClassOutcome {
            class_index,
            result,
        }
    }
}

#[async_trait]
impl Agent for ScrapingAgent {
    async fn run(&self, job: &CrawlJob) -> Vec<ClassOutcome> {
        info!(
            user_id = %job.user_id,
            classes = job.classes.len(),
            "Start looking for results"
        );

        let mut pending: FuturesUnordered<_> = job
            .classes
            .iter()
            .enumerate()
            .map(|(i, class)| self.run_class(job, i, class))
            .collect();

        // Requests finish in any order; slot each outcome back at its index.
        let mut slots: Vec<Option<ClassOutcome>> = vec![None; job.classes.len()];
        while let Some(outcome) = pending.next().await {
            if let Some(error) = outcome.error() {
                warn!(
                    user_id = %job.user_id,
                    class = %job.classes[outcome.class_index].name,
                    "{}", error
                );
            }
            let index = outcome.class_index;
            slots[index] = Some(outcome);
        }

        info!(user_id = %job.user_id, "Done looking for results");

        slots.into_iter().flatten().collect()
    }
}
