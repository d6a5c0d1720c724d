//! Time-bounded in-memory result cache.
//!
//! `get` is strictly read-only: an expired entry is reported as absent but
//! left in place, so the hot read path never takes the write lock. A single
//! background sweep task deletes expired entries on a fixed period.

use std::collections::HashMap;
use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tokio::sync::{watch, RwLock};
use tracing::debug;

use super::Document;

const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    documents: Vec<Document>,
    expires_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct ResultCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
    shutdown: watch::Sender<bool>,
}

impl ResultCache {
    /// Create a cache with the standard hourly sweep. Must be called from
    /// within a Tokio runtime.
    pub fn new(ttl: Duration) -> Self {
        Self::with_sweep_interval(ttl, SWEEP_INTERVAL)
    }

    pub fn with_sweep_interval(ttl: Duration, sweep_interval: std::time::Duration) -> Self {
        let entries = Arc::new(RwLock::new(HashMap::new()));
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let sweep_entries = Arc::clone(&entries);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let now = OffsetDateTime::now_utc();
                        let mut entries = sweep_entries.write().await;
                        let before = entries.len();
                        entries.retain(|_, entry: &mut CacheEntry| entry.expires_at > now);
                        let removed = before - entries.len();
                        if removed > 0 {
                            debug!(removed, "swept expired cache entries");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            entries,
            ttl,
            shutdown,
        }
    }

    /// Return the cached documents for `key` if present and not expired.
    /// Never mutates the entry set; cleanup belongs to the sweep task.
    pub async fn get(&self, key: &str) -> Option<Vec<Document>> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if OffsetDateTime::now_utc() >= entry.expires_at {
            return None;
        }
        Some(entry.documents.clone())
    }

    /// Store `documents` under `key`, unconditionally replacing any prior
    /// entry.
    pub async fn set(&self, key: impl Into<String>, documents: Vec<Document>) {
        let entry = CacheEntry {
            documents,
            expires_at: OffsetDateTime::now_utc() + self.ttl,
        };
        self.entries.write().await.insert(key.into(), entry);
    }

    /// Snapshot of all keys, expired entries included. The fuzzy lookup in
    /// the orchestrator scans these.
    pub async fn keys(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    /// Number of stored entries, counting expired ones the sweep has not yet
    /// removed.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Stop the sweep task. Idempotent; cached entries stay readable.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Drop for ResultCache {
    fn drop(&mut self) {
        self.close();
    }
}
