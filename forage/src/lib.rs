//! Forage - federated document retrieval.
//!
//! Given a topic query and a set of heterogeneous content sources, forage
//! fetches candidate documents concurrently, filters them with a boolean
//! keyword expression, ranks them by source authority and caches the result,
//! so a downstream consumer sees a single ranked document list no matter how
//! many backends were asked.
//!
//! The pieces:
//!
//! - [`retrieval::query`] - boolean query parsing and evaluation
//! - [`retrieval::ResultCache`] - TTL cache with fuzzy lookup support
//! - [`retrieval::RateLimiter`] / [`retrieval::CircuitBreaker`] - per-source
//!   pacing and per-domain failure suppression
//! - [`retrieval::Orchestrator`] - the composition root fanning requests out
//!   to protocol adapters
//!
//! # Example
//!
//! ```ignore
//! use forage::retrieval::{Orchestrator, OrchestratorConfig};
//!
//! let settings = forage::config::read_config()?;
//! let orchestrator = Orchestrator::from_settings(&settings)?;
//! let docs = orchestrator.fetch_from_source("wiki", "mobile AND crash", 20).await?;
//! ```

pub mod config;
pub mod retrieval;

pub use retrieval::{Document, Orchestrator, OrchestratorError};
