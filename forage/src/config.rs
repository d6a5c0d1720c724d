//! Layered configuration: base file, environment file, `FORAGE_*` overrides.

use std::str::FromStr;

use serde::Deserialize;
use strum::{Display, EnumString};

use crate::retrieval::SourceConfig;

#[derive(Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    /// The static source table. Loaded once at startup; read-only afterwards.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Deserialize, Clone)]
pub struct RetrievalSettings {
    #[serde(default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: i64,
    /// Word-set similarity required for a fuzzy cache hit.
    #[serde(default = "default_fuzzy_similarity")]
    pub fuzzy_similarity: f64,
    /// Overall deadline for multi-source fan-outs, in seconds. Absent means
    /// no deadline.
    #[serde(default)]
    pub fan_out_deadline_seconds: Option<u64>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            cache_ttl_minutes: default_cache_ttl_minutes(),
            fuzzy_similarity: default_fuzzy_similarity(),
            fan_out_deadline_seconds: None,
        }
    }
}

fn default_cache_ttl_minutes() -> i64 {
    15
}

fn default_fuzzy_similarity() -> f64 {
    0.9
}

pub fn read_config() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let config_directory = base_path.join("config");

    let environment = Environment::from_str(
        std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .as_str(),
    )
    .expect("Failed to parse APP_ENVIRONMENT");
    let environment_filename = format!("{}.yaml", environment);

    let settings = config::Config::builder()
        .add_source(config::File::from(config_directory.join("base.yaml")))
        .add_source(config::File::from(
            config_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("FORAGE")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[derive(Display, Debug, EnumString)]
pub enum Environment {
    #[strum(ascii_case_insensitive, serialize = "local")]
    Local,
    #[strum(ascii_case_insensitive, serialize = "production")]
    Production,
}
