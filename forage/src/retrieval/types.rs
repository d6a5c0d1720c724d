//! Core types for the retrieval domain.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

/// Backend kind behind a source. One adapter implementation exists per kind;
/// several sources may share the same kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ProtocolKind {
    Web,
    Github,
    Jira,
    Confluence,
    Discourse,
    Mattermost,
    LocalFile,
}

/// Authentication scheme declared by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    #[default]
    None,
    Token,
    Basic,
}

/// Credentials pushed onto an adapter before each fetch.
///
/// An empty `key` with a non-`None` kind means "unauthenticated": adapters
/// degrade gracefully or return no documents, never fail hard on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub kind: AuthKind,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl AuthConfig {
    /// True when the source declares an auth scheme but no credential was
    /// provided.
    pub fn is_unauthenticated(&self) -> bool {
        self.kind != AuthKind::None && self.key.is_empty()
    }
}

/// Static per-source descriptor, loaded once at startup and read-only from
/// the orchestrator's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique source name, used in cache keys. Must not contain `:`.
    pub name: String,
    pub protocol: ProtocolKind,
    /// Named endpoints, e.g. `base`, `search`. Which names are required is up
    /// to the adapter for the protocol kind.
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Sections (spaces, repos, categories, ...) this source exposes.
    #[serde(default)]
    pub sections: Vec<String>,
    /// Hard cap on documents per fetch; requested limits are clamped to it.
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Token-bucket burst size for this source.
    #[serde(default = "default_burst")]
    pub burst: u32,
}

fn default_max_documents() -> usize {
    25
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_burst() -> u32 {
    5
}

/// A single fetch, built once per orchestrator call. Value type; never shared
/// across concurrent fetches.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub source: SourceConfig,
    pub topic: String,
    pub sections: Vec<String>,
    pub limit: usize,
}

/// A retrieved document as produced by an adapter and ranked by the
/// orchestrator. Immutable once ranked.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub title: String,
    pub content: String,
    pub url: String,
    pub section: String,
    /// Name of the source that produced this document.
    pub source: String,
    pub labels: Vec<String>,
    pub author: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_modified: Option<OffsetDateTime>,
    /// Assigned by the orchestrator during ranking; any value an adapter puts
    /// here is overwritten.
    pub authority_score: f64,
}

impl Document {
    /// The text the boolean post-filter evaluates against.
    pub fn searchable_text(&self) -> String {
        let mut text = String::with_capacity(
            self.title.len() + self.content.len() + self.labels.iter().map(String::len).sum::<usize>() + 8,
        );
        text.push_str(&self.title);
        text.push('\n');
        text.push_str(&self.content);
        for label in &self.labels {
            text.push('\n');
            text.push_str(label);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_kind_round_trips_through_strings() {
        use std::str::FromStr;

        assert_eq!(ProtocolKind::Web.to_string(), "web");
        assert_eq!(ProtocolKind::LocalFile.to_string(), "local_file");
        assert_eq!(ProtocolKind::from_str("JIRA").unwrap(), ProtocolKind::Jira);
        assert!(ProtocolKind::from_str("gopher").is_err());
    }

    #[test]
    fn auth_config_detects_missing_credentials() {
        let auth = AuthConfig {
            kind: AuthKind::Token,
            key: String::new(),
            username: None,
        };
        assert!(auth.is_unauthenticated());

        assert!(!AuthConfig::default().is_unauthenticated());
    }

    #[test]
    fn documents_serialize_timestamps_as_rfc3339() {
        use time::macros::datetime;

        let doc = Document {
            title: "t".to_string(),
            content: "c".to_string(),
            url: "https://example.com".to_string(),
            section: String::new(),
            source: "wiki".to_string(),
            labels: vec![],
            author: None,
            created_at: Some(datetime!(2024-03-01 12:00:00 UTC)),
            last_modified: None,
            authority_score: 0.5,
        };

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["created_at"], "2024-03-01T12:00:00Z");
        assert!(value["last_modified"].is_null());
    }

    #[test]
    fn searchable_text_includes_labels() {
        let doc = Document {
            title: "Crash on startup".to_string(),
            content: "The app crashes".to_string(),
            url: "https://tracker.example.com/1".to_string(),
            section: "bugs".to_string(),
            source: "tracker".to_string(),
            labels: vec!["mobile".to_string()],
            author: None,
            created_at: None,
            last_modified: None,
            authority_score: 0.0,
        };
        assert!(doc.searchable_text().contains("mobile"));
    }
}
