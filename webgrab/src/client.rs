use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::Page;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimal HTTP client for fetching documents from generic web sites.
///
/// Connection pooling is handled by the underlying `reqwest::Client`, so one
/// `WebClient` can be shared across many concurrent fetches.
#[derive(Debug, Clone)]
pub struct WebClient {
    http: reqwest::Client,
}

impl WebClient {
    pub fn new() -> Result<Self, WebFetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, WebFetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WebFetchError::Client(e.to_string()))?;
        Ok(Self { http })
    }

    /// Fetch a single page, optionally with a bearer token.
    pub async fn fetch_page(
        &self,
        url: impl AsRef<str>,
        bearer_token: Option<&str>,
    ) -> Result<Page, WebFetchError> {
        let mut request = self.http.get(url.as_ref());
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| WebFetchError::Response(e.to_string()))?;

        let status = resp.status();
        debug!(url = url.as_ref(), status = status.as_u16(), "fetched page");
        if status == 401 || status == 403 {
            return Err(WebFetchError::Unauthorized);
        }
        if !status.is_success() {
            return Err(WebFetchError::Status(status.as_u16()));
        }

        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let final_url = resp.url().to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| WebFetchError::Response(e.to_string()))?;

        Ok(Page {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

#[derive(Error, Debug)]
pub enum WebFetchError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Unexpected status: {0}")]
    Status(u16),
    #[error("ResponseError: {0}")]
    Response(String),
    #[error("ClientError: {0}")]
    Client(String),
}

impl WebFetchError {
    /// True for failures worth counting against the remote host (as opposed
    /// to auth problems, which say nothing about the host's health).
    pub fn is_transport(&self) -> bool {
        matches!(self, WebFetchError::Status(_) | WebFetchError::Response(_))
    }
}
