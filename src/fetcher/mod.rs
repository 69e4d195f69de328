pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpTransport;

/// A form POST against the results site.
#[derive(Clone)]
pub struct FormRequest {
    pub url: String,
    pub user_agent: String,
    pub fields: Vec<(&'static str, String)>,
}

impl FormRequest {
    /// `application/x-www-form-urlencoded` body of the request.
    pub fn encoded_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter().map(|(k, v)| (*k, v.as_str())))
            .finish()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

// Field values include credentials, so only names are printed.
impl std::fmt::Debug for FormRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormRequest")
            .field("url", &self.url)
            .field("fields", &self.fields.iter().map(|(k, _)| *k).collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the results site. Non-2xx answers are returned as
/// responses; only failures to get an answer at all are errors.
#[async_trait]
pub trait Transport {
    async fn execute(&self, request: FormRequest) -> Result<TransportResponse>;
}
