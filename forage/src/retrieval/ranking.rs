//! Authority ranking of merged results.
//!
//! Each document's URL host is looked up in a static authority table; a few
//! well-known hosts get a different weight for specific path prefixes.
//! Unmatched hosts receive a low default. The sort is stable on purpose:
//! adapters often deliver documents in a meaningful order (recency, backend
//! relevance) and that order must survive within an authority tier.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::LazyLock;

use url::Url;

use super::Document;

const DEFAULT_AUTHORITY: f64 = 0.3;

/// Host + path-prefix overrides, consulted before the plain host table.
static AUTHORITY_PATH_PREFIXES: LazyLock<Vec<(&'static str, &'static str, f64)>> =
    LazyLock::new(|| {
        vec![
            ("stackoverflow.com", "/questions", 0.95),
            ("github.com", "/blog", 0.5),
            ("reddit.com", "/r/programming", 0.6),
        ]
    });

static AUTHORITY_HOSTS: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    HashMap::from([
        ("stackoverflow.com", 0.9),
        ("serverfault.com", 0.85),
        ("superuser.com", 0.8),
        ("github.com", 0.9),
        ("gitlab.com", 0.85),
        ("en.wikipedia.org", 0.9),
        ("developer.mozilla.org", 0.95),
        ("docs.rs", 0.9),
        ("crates.io", 0.85),
        ("news.ycombinator.com", 0.7),
        ("reddit.com", 0.5),
        ("medium.com", 0.45),
    ])
});

/// Authority score for a document URL. Unparseable URLs and unknown hosts
/// fall back to the default.
pub fn authority_for(url: &str) -> f64 {
    let Ok(parsed) = Url::parse(url) else {
        return DEFAULT_AUTHORITY;
    };
    let Some(host) = parsed.host_str() else {
        return DEFAULT_AUTHORITY;
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    let path = parsed.path();

    for (prefix_host, path_prefix, score) in AUTHORITY_PATH_PREFIXES.iter() {
        if host == *prefix_host && path.starts_with(path_prefix) {
            return *score;
        }
    }
    AUTHORITY_HOSTS.get(host).copied().unwrap_or(DEFAULT_AUTHORITY)
}

/// Assign authority scores and sort descending. Stable: equal-authority
/// documents keep their input order.
pub fn rank_by_authority(mut documents: Vec<Document>) -> Vec<Document> {
    for document in &mut documents {
        document.authority_score = authority_for(&document.url);
    }
    documents.sort_by(|a, b| {
        b.authority_score
            .partial_cmp(&a.authority_score)
            .unwrap_or(Ordering::Equal)
    });
    documents
}
