use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;

use crate::app::Result;
use crate::fetcher::{FormRequest, Transport, TransportResponse};
use crate::scraper::SiteConfig;

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &SiteConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(&SiteConfig::default())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: FormRequest) -> Result<TransportResponse> {
        let mut builder = self
            .client
            .post(&request.url)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .body(request.encoded_body());

        if let Ok(value) = HeaderValue::from_str(&request.user_agent) {
            builder = builder.header(USER_AGENT, value);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(TransportResponse { status, body })
    }
}
