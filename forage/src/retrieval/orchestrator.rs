//! The retrieval orchestrator: composition root for federated fetches.
//!
//! Owns the source table, the protocol-adapter registry, the result cache and
//! the request gate. A single-source fetch runs a fixed sequence (cache check,
//! adapter call, boolean post-filter, ranking, cache populate); a multi-source
//! fetch fans that sequence out with one task per source and merges whatever
//! succeeds.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::Settings;

use super::adapter::{AdapterError, ProtocolAdapter};
use super::cache::ResultCache;
use super::gate::RequestGate;
use super::query::parse_boolean_topic;
use super::ranking::rank_by_authority;
use super::source::WebAdapter;
use super::types::{Document, FetchRequest, ProtocolKind, SourceConfig};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("unknown source '{0}'")]
    SourceNotFound(String),

    #[error("no adapter registered for protocol '{0}'")]
    ProtocolNotSupported(ProtocolKind),

    #[error("fetch from source '{source}' failed")]
    Fetch {
        source: String,
        #[source]
        cause: AdapterError,
    },

    #[error("fan-out deadline expired before all sources reported")]
    DeadlineExceeded,

    #[error("adapter initialization failed")]
    AdapterInit(#[source] AdapterError),
}

/// Tuning knobs for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub cache_ttl: time::Duration,
    /// Word-set Jaccard similarity required for a fuzzy cache hit.
    pub fuzzy_similarity: f64,
    /// Overall deadline for a multi-source fan-out. `None` waits for every
    /// source.
    pub fan_out_deadline: Option<std::time::Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: time::Duration::minutes(15),
            fuzzy_similarity: 0.9,
            fan_out_deadline: None,
        }
    }
}

/// Outcome of a multi-source fetch: per-source results for everything that
/// reported in time, plus the deadline error when the fan-out was cut short.
#[derive(Debug, Default)]
pub struct FanOutResult {
    pub documents: HashMap<String, Vec<Document>>,
    pub error: Option<OrchestratorError>,
}

/// The composition root. All registries are owned by the instance and
/// read-only after construction; two orchestrators share no state.
///
/// Cheap to clone: clones share the same cache, gate and registries.
#[derive(Clone)]
pub struct Orchestrator {
    sources: Arc<HashMap<String, SourceConfig>>,
    adapters: Arc<HashMap<ProtocolKind, Arc<dyn ProtocolAdapter>>>,
    cache: Arc<ResultCache>,
    gate: Arc<RequestGate>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Build an orchestrator over the given sources and adapters. Must be
    /// called from within a Tokio runtime (the cache spawns its sweep task).
    pub fn new(
        sources: Vec<SourceConfig>,
        adapters: Vec<Arc<dyn ProtocolAdapter>>,
        config: OrchestratorConfig,
    ) -> Self {
        Self::with_gate(sources, adapters, Arc::new(RequestGate::new()), config)
    }

    /// Like [`new`](Self::new), but sharing a caller-provided gate with the
    /// adapters (network adapters need the same gate instance they were
    /// constructed with).
    pub fn with_gate(
        sources: Vec<SourceConfig>,
        adapters: Vec<Arc<dyn ProtocolAdapter>>,
        gate: Arc<RequestGate>,
        config: OrchestratorConfig,
    ) -> Self {
        let sources = sources
            .into_iter()
            .map(|source| (source.name.clone(), source))
            .collect();
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.kind(), adapter))
            .collect();
        let cache = Arc::new(ResultCache::new(config.cache_ttl));

        Self {
            sources: Arc::new(sources),
            adapters: Arc::new(adapters),
            cache,
            gate,
            config,
        }
    }

    /// Wire up an orchestrator from loaded [`Settings`], registering the
    /// in-tree web adapter.
    pub fn from_settings(settings: &Settings) -> Result<Self, OrchestratorError> {
        let gate = Arc::new(RequestGate::new());
        let web = WebAdapter::new(Arc::clone(&gate)).map_err(OrchestratorError::AdapterInit)?;

        let config = OrchestratorConfig {
            cache_ttl: time::Duration::minutes(settings.retrieval.cache_ttl_minutes),
            fuzzy_similarity: settings.retrieval.fuzzy_similarity,
            fan_out_deadline: settings
                .retrieval
                .fan_out_deadline_seconds
                .map(std::time::Duration::from_secs),
        };

        Ok(Self::with_gate(
            settings.sources.clone(),
            vec![Arc::new(web)],
            gate,
            config,
        ))
    }

    /// Fetch documents about `topic` from one named source.
    ///
    /// Configuration errors (unknown source, unsupported protocol) return
    /// before any network activity. Adapter errors are wrapped, not retried,
    /// and never cached, so the next call may succeed. On success the result
    /// is ranked by authority and, if non-empty, cached.
    pub async fn fetch_from_source(
        &self,
        source_name: &str,
        topic: &str,
        limit: usize,
    ) -> Result<Vec<Document>, OrchestratorError> {
        let source = self
            .sources
            .get(source_name)
            .ok_or_else(|| OrchestratorError::SourceNotFound(source_name.to_string()))?;

        let canonical = canonicalize_topic(topic);
        let key = cache_key(&source.name, &canonical, limit);
        if let Some(documents) = self.cache.get(&key).await {
            debug!(source = %source.name, topic = %canonical, "exact cache hit");
            return Ok(documents);
        }
        if let Some(documents) = self.fuzzy_cache_lookup(&source.name, &canonical, limit).await {
            return Ok(documents);
        }

        let adapter = self
            .adapters
            .get(&source.protocol)
            .ok_or(OrchestratorError::ProtocolNotSupported(source.protocol))?;

        let request = FetchRequest {
            source: source.clone(),
            topic: topic.to_string(),
            sections: source.sections.clone(),
            limit: limit.min(source.max_documents),
        };
        adapter.set_auth(source.auth.clone());

        let mut documents =
            adapter
                .fetch(&request)
                .await
                .map_err(|cause| OrchestratorError::Fetch {
                    source: source.name.clone(),
                    cause,
                })?;
        debug!(
            source = %source.name,
            count = documents.len(),
            "adapter fetch completed"
        );

        // Post-filter with the boolean expression when the topic has one;
        // plain keyword topics pass everything through.
        if let Some(expression) = parse_boolean_topic(topic) {
            documents.retain(|document| expression.evaluate(&document.searchable_text()));
        }

        // Adapters are expected to honor the limit but are not trusted to.
        documents.truncate(request.limit);

        let ranked = rank_by_authority(documents);
        if !ranked.is_empty() {
            self.cache.set(key, ranked.clone()).await;
        }
        Ok(ranked)
    }

    /// Fan a fetch out to several sources concurrently.
    ///
    /// Per-source failures are logged and that source is omitted from the
    /// merged map; they never fail the overall call. When the configured
    /// deadline expires first, whatever has completed is returned together
    /// with [`OrchestratorError::DeadlineExceeded`].
    pub async fn fetch_from_multiple_sources(
        &self,
        source_names: &[String],
        topic: &str,
        limit_per_source: usize,
    ) -> FanOutResult {
        let (tx, mut rx) = mpsc::channel(source_names.len().max(1));

        for name in source_names {
            let orchestrator = self.clone();
            let tx = tx.clone();
            let name = name.clone();
            let topic = topic.to_string();
            tokio::spawn(async move {
                let result = orchestrator
                    .fetch_from_source(&name, &topic, limit_per_source)
                    .await;
                // The collector may have given up on us; a dropped receiver
                // just discards this result.
                let _ = tx.send((name, result)).await;
            });
        }
        drop(tx);

        let deadline = self
            .config
            .fan_out_deadline
            .map(|d| tokio::time::Instant::now() + d);

        let mut result = FanOutResult::default();
        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, rx.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(
                            completed = result.documents.len(),
                            requested = source_names.len(),
                            "fan-out deadline expired"
                        );
                        result.error = Some(OrchestratorError::DeadlineExceeded);
                        break;
                    }
                },
                None => rx.recv().await,
            };
            let Some((name, outcome)) = next else {
                break;
            };
            match outcome {
                Ok(documents) => {
                    result.documents.insert(name, documents);
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "source fetch failed; omitted from merge");
                }
            }
        }
        result
    }

    async fn fuzzy_cache_lookup(
        &self,
        source_name: &str,
        canonical_topic: &str,
        limit: usize,
    ) -> Option<Vec<Document>> {
        let prefix = format!("{source_name}:");
        let suffix = format!(":{limit}");

        let mut best: Option<(String, f64)> = None;
        for key in self.cache.keys().await {
            // The topic may contain ':' safely; only the fixed prefix and
            // suffix delimit it.
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            let Some(candidate_topic) = rest.strip_suffix(&suffix) else {
                continue;
            };
            let similarity = jaccard(canonical_topic, candidate_topic);
            if similarity >= self.config.fuzzy_similarity
                && best.as_ref().is_none_or(|(_, s)| similarity > *s)
            {
                best = Some((key, similarity));
            }
        }

        let (key, similarity) = best?;
        let documents = self.cache.get(&key).await?;
        debug!(source = source_name, key = %key, similarity, "fuzzy cache hit");
        Some(documents)
    }

    /// Shut down the cache sweep, the rate limiters and every adapter.
    /// Idempotent.
    pub async fn close(&self) {
        self.cache.close();
        self.gate.close().await;
        for adapter in self.adapters.values() {
            if let Err(e) = adapter.close().await {
                warn!(protocol = %adapter.kind(), error = %e, "adapter close failed");
            }
        }
    }
}

fn cache_key(source_name: &str, canonical_topic: &str, limit: usize) -> String {
    format!("{source_name}:{canonical_topic}:{limit}")
}

/// Canonicalize a topic for cache keying: trim, strip one wrapping quote
/// pair, lowercase, collapse internal whitespace. Deliberately no synonym or
/// keyword expansion, so unrelated queries never collide.
fn canonicalize_topic(topic: &str) -> String {
    let mut trimmed = topic.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            trimmed = trimmed[1..trimmed.len() - 1].trim();
            break;
        }
    }
    trimmed
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Word-set Jaccard similarity between two canonicalized topics.
fn jaccard(a: &str, b: &str) -> f64 {
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    if words_a.is_empty() && words_b.is_empty() {
        return 1.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f64 / union as f64
}
