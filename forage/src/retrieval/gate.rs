//! Shared request gate: the per-source rate limiters and the per-domain
//! circuit breaker one orchestrator instance hands to its network adapters.
//!
//! Limiters are created lazily on a source's first request and reused for the
//! lifetime of the gate, so pacing state survives across fetches without
//! being visible to callers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::breaker::CircuitBreaker;
use super::rate_limit::RateLimiter;
use super::types::SourceConfig;

#[derive(Debug, Default)]
pub struct RequestGate {
    registry: RwLock<LimiterRegistry>,
    breaker: CircuitBreaker,
}

/// Limiter map plus the gate's shutdown state, guarded together so a
/// `limiter_for` racing with `close` cannot produce a live limiter.
#[derive(Debug, Default)]
struct LimiterRegistry {
    by_source: HashMap<String, Arc<RateLimiter>>,
    closed: bool,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rate limiter for `source`, created on first use with the source's
    /// configured budget. After [`close`](Self::close), new limiters are
    /// handed out already closed.
    pub async fn limiter_for(&self, source: &SourceConfig) -> Arc<RateLimiter> {
        if let Some(limiter) = self.registry.read().await.by_source.get(&source.name) {
            return Arc::clone(limiter);
        }

        let mut registry = self.registry.write().await;
        let closed = registry.closed;
        // A concurrent fetch may have created it between the two locks.
        let limiter = registry.by_source.entry(source.name.clone()).or_insert_with(|| {
            let limiter =
                Arc::new(RateLimiter::new(source.requests_per_minute, source.burst));
            if closed {
                limiter.close();
            }
            limiter
        });
        Arc::clone(limiter)
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Close every limiter created so far and mark the gate shut down.
    /// Idempotent.
    pub async fn close(&self) {
        let mut registry = self.registry.write().await;
        registry.closed = true;
        for limiter in registry.by_source.values() {
            limiter.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::types::{AuthConfig, ProtocolKind};

    fn source(name: &str) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            protocol: ProtocolKind::Web,
            endpoints: HashMap::new(),
            auth: AuthConfig::default(),
            sections: vec![],
            max_documents: 25,
            requests_per_minute: 60,
            burst: 2,
        }
    }

    #[tokio::test]
    async fn limiter_is_created_once_per_source() {
        let gate = RequestGate::new();
        let config = source("wiki");

        let first = gate.limiter_for(&config).await;
        let second = gate.limiter_for(&config).await;
        assert!(Arc::ptr_eq(&first, &second));

        let other = gate.limiter_for(&source("tracker")).await;
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[tokio::test]
    async fn close_shuts_down_existing_limiters() {
        let gate = RequestGate::new();
        let limiter = gate.limiter_for(&source("wiki")).await;

        gate.close().await;
        gate.close().await;
        assert!(limiter.wait().await.is_err());
    }

    #[tokio::test]
    async fn limiters_created_after_close_start_closed() {
        let gate = RequestGate::new();
        gate.close().await;

        let limiter = gate.limiter_for(&source("wiki")).await;
        assert!(limiter.wait().await.is_err());
    }
}
