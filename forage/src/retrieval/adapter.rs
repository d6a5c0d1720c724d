//! The protocol-adapter contract: the boundary between the orchestration
//! core and backend-specific fetchers.

use async_trait::async_trait;

use super::types::{AuthConfig, Document, FetchRequest, ProtocolKind};

/// Error surfaced by an adapter. Adapters wrap backend failures; they never
/// panic on them.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("backend request failed: {0}")]
    Backend(String),

    #[error("response parsing failed: {0}")]
    Parse(String),

    #[error("source configuration is missing required endpoint '{0}'")]
    MissingEndpoint(&'static str),

    #[error("adapter initialization failed: {0}")]
    Init(String),
}

/// One implementation per backend kind, registered with the orchestrator
/// under its [`ProtocolKind`].
///
/// Contract:
/// - honor `request.limit` best-effort (the orchestrator truncates
///   defensively either way);
/// - wrap backend failures in [`AdapterError`] instead of panicking;
/// - treat a declared-but-empty credential
///   ([`AuthConfig::is_unauthenticated`]) as "degrade gracefully or return no
///   documents", never as fatal;
/// - treat an open circuit breaker or a closed rate limiter as "skip this
///   request" and return an empty result.
///
/// Cancellation is drop-based: when the caller's future is dropped, any
/// in-flight I/O inside `fetch` is aborted with it.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Document>, AdapterError>;

    fn kind(&self) -> ProtocolKind;

    /// Push credentials onto the adapter. Called by the orchestrator before
    /// each fetch; adapters keep their own mutable auth state.
    fn set_auth(&self, auth: AuthConfig);

    /// Release backend resources. Safe to call more than once.
    async fn close(&self) -> Result<(), AdapterError> {
        Ok(())
    }
}
