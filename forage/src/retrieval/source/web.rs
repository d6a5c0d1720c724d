//! Generic web-site adapter.
//!
//! Fetches the source's search endpoint over HTTP and turns the response page
//! into a document. Boolean topics are degraded to a flat keyword string
//! since a plain query parameter cannot express boolean logic.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{debug, warn};
use webgrab::{WebClient, WebFetchError, WebUrl};

use crate::retrieval::adapter::{AdapterError, ProtocolAdapter};
use crate::retrieval::gate::RequestGate;
use crate::retrieval::query::simplify_to_keywords;
use crate::retrieval::types::{AuthConfig, AuthKind, Document, FetchRequest, ProtocolKind};

pub struct WebAdapter {
    client: WebClient,
    gate: Arc<RequestGate>,
    auth: RwLock<AuthConfig>,
}

impl WebAdapter {
    pub fn new(gate: Arc<RequestGate>) -> Result<Self, AdapterError> {
        let client = WebClient::new().map_err(|e| AdapterError::Init(e.to_string()))?;
        Ok(Self {
            client,
            gate,
            auth: RwLock::new(AuthConfig::default()),
        })
    }

    fn current_auth(&self) -> AuthConfig {
        self.auth
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn document_from_page(page: webgrab::Page, request: &FetchRequest) -> Document {
        Document {
            title: page.title().unwrap_or_else(|| page.url.clone()),
            content: page.body,
            url: page.url,
            section: request.sections.first().cloned().unwrap_or_default(),
            source: request.source.name.clone(),
            labels: vec![],
            author: None,
            created_at: None,
            last_modified: None,
            authority_score: 0.0,
        }
    }
}

#[async_trait]
impl ProtocolAdapter for WebAdapter {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Document>, AdapterError> {
        let endpoints = &request.source.endpoints;
        let Some(base) = endpoints.get("search").or_else(|| endpoints.get("base")) else {
            return Err(AdapterError::MissingEndpoint("search"));
        };

        if self.gate.breaker().is_open(base) {
            debug!(source = %request.source.name, "circuit open; skipping request");
            return Ok(vec![]);
        }

        let limiter = self.gate.limiter_for(&request.source).await;
        if limiter.wait().await.is_err() {
            debug!(source = %request.source.name, "rate limiter closed; skipping request");
            return Ok(vec![]);
        }

        let auth = self.current_auth();
        if auth.is_unauthenticated() {
            warn!(
                source = %request.source.name,
                "auth declared but no credential configured; returning no documents"
            );
            return Ok(vec![]);
        }
        let token = match auth.kind {
            AuthKind::Token => Some(auth.key.as_str()),
            _ => None,
        };

        let keywords = simplify_to_keywords(&request.topic);
        let url = WebUrl::new(base.clone()).with_query("q", &keywords);

        match self.client.fetch_page(&url, token).await {
            Ok(page) => {
                let documents = vec![Self::document_from_page(page, request)];
                Ok(documents.into_iter().take(request.limit).collect())
            }
            Err(WebFetchError::Unauthorized) => {
                warn!(source = %request.source.name, "backend rejected credentials");
                Ok(vec![])
            }
            Err(e) => {
                if e.is_transport() {
                    self.gate.breaker().record_failure(url.as_ref());
                }
                Err(AdapterError::Backend(e.to_string()))
            }
        }
    }

    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Web
    }

    fn set_auth(&self, auth: AuthConfig) {
        *self.auth.write().unwrap_or_else(PoisonError::into_inner) = auth;
    }
}
