//! Mock protocol adapter for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::retrieval::adapter::{AdapterError, ProtocolAdapter};
use crate::retrieval::types::{AuthConfig, Document, FetchRequest, ProtocolKind};

/// Mock adapter with configurable documents and failure mode.
///
/// # Examples
///
/// ```
/// use forage::retrieval::source::MockAdapter;
/// use forage::retrieval::ProtocolKind;
///
/// let adapter = MockAdapter::new(ProtocolKind::Web);
/// assert_eq!(adapter.fetch_count(), 0);
///
/// let failing = MockAdapter::new(ProtocolKind::Jira).failing_with("boom");
/// ```
#[derive(Clone)]
pub struct MockAdapter {
    kind: ProtocolKind,
    documents: Arc<RwLock<Vec<Document>>>,
    failure: Arc<RwLock<Option<String>>>,
    honor_limit: Arc<RwLock<bool>>,
    delay: Arc<RwLock<Option<std::time::Duration>>>,
    fetch_count: Arc<AtomicUsize>,
    last_auth: Arc<RwLock<Option<AuthConfig>>>,
}

impl MockAdapter {
    pub fn new(kind: ProtocolKind) -> Self {
        Self {
            kind,
            documents: Arc::new(RwLock::new(vec![])),
            failure: Arc::new(RwLock::new(None)),
            honor_limit: Arc::new(RwLock::new(true)),
            delay: Arc::new(RwLock::new(None)),
            fetch_count: Arc::new(AtomicUsize::new(0)),
            last_auth: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_documents(self, documents: Vec<Document>) -> Self {
        *self.documents.write().unwrap_or_else(PoisonError::into_inner) = documents;
        self
    }

    /// Make every fetch fail with the given message.
    pub fn failing_with(self, message: &str) -> Self {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) =
            Some(message.to_string());
        self
    }

    /// Return all configured documents regardless of the requested limit,
    /// for exercising the orchestrator's defensive truncation.
    pub fn ignoring_limit(self) -> Self {
        *self.honor_limit.write().unwrap_or_else(PoisonError::into_inner) = false;
        self
    }

    /// Sleep for the given duration before responding, for exercising
    /// fan-out deadlines.
    pub fn delayed_by(self, delay: std::time::Duration) -> Self {
        *self.delay.write().unwrap_or_else(PoisonError::into_inner) = Some(delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// The auth config most recently pushed via `set_auth`.
    pub fn last_auth(&self) -> Option<AuthConfig> {
        self.last_auth
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ProtocolAdapter for MockAdapter {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Document>, AdapterError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self
            .failure
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(AdapterError::Backend(message));
        }

        let documents = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let honor_limit = *self.honor_limit.read().unwrap_or_else(PoisonError::into_inner);
        if honor_limit {
            Ok(documents.into_iter().take(request.limit).collect())
        } else {
            Ok(documents)
        }
    }

    fn kind(&self) -> ProtocolKind {
        self.kind
    }

    fn set_auth(&self, auth: AuthConfig) {
        *self.last_auth.write().unwrap_or_else(PoisonError::into_inner) = Some(auth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request(limit: usize) -> FetchRequest {
        FetchRequest {
            source: crate::retrieval::types::SourceConfig {
                name: "mock".to_string(),
                protocol: ProtocolKind::Web,
                endpoints: HashMap::new(),
                auth: AuthConfig::default(),
                sections: vec![],
                max_documents: 25,
                requests_per_minute: 60,
                burst: 5,
            },
            topic: "topic".to_string(),
            sections: vec![],
            limit,
        }
    }

    fn doc(title: &str) -> Document {
        Document {
            title: title.to_string(),
            content: String::new(),
            url: "https://example.com".to_string(),
            section: String::new(),
            source: "mock".to_string(),
            labels: vec![],
            author: None,
            created_at: None,
            last_modified: None,
            authority_score: 0.0,
        }
    }

    #[tokio::test]
    async fn returns_configured_documents_up_to_limit() {
        let adapter =
            MockAdapter::new(ProtocolKind::Web).with_documents(vec![doc("a"), doc("b"), doc("c")]);

        let documents = adapter.fetch(&request(2)).await.unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(adapter.fetch_count(), 1);
    }

    #[tokio::test]
    async fn failure_mode_surfaces_backend_error() {
        let adapter = MockAdapter::new(ProtocolKind::Web).failing_with("boom");
        let err = adapter.fetch(&request(5)).await.unwrap_err();
        assert!(matches!(err, AdapterError::Backend(msg) if msg == "boom"));
    }

    #[tokio::test]
    async fn records_pushed_auth() {
        let adapter = MockAdapter::new(ProtocolKind::Web);
        assert!(adapter.last_auth().is_none());

        adapter.set_auth(AuthConfig::default());
        assert!(adapter.last_auth().is_some());
    }
}
