//! Retrieval orchestration: multi-source fan-out, boolean post-filtering,
//! authority ranking, caching and request pacing.
//!
//! The module is built around one trait boundary, [`ProtocolAdapter`]: every
//! backend kind (generic web site, issue tracker, wiki, ...) implements the
//! same fetch contract and is registered with the [`Orchestrator`] under its
//! [`ProtocolKind`]. Everything on this side of that boundary - query
//! filtering, caching, rate limiting, circuit breaking, ranking - is backend
//! agnostic.

mod adapter;
mod breaker;
mod cache;
mod gate;
mod orchestrator;
mod rate_limit;
mod ranking;
mod types;

pub mod query;
pub mod source;

pub use adapter::{AdapterError, ProtocolAdapter};
pub use breaker::CircuitBreaker;
pub use cache::ResultCache;
pub use gate::RequestGate;
pub use orchestrator::{FanOutResult, Orchestrator, OrchestratorConfig, OrchestratorError};
pub use rate_limit::{RateLimitError, RateLimiter};
pub use ranking::rank_by_authority;
pub use types::{AuthConfig, AuthKind, Document, FetchRequest, ProtocolKind, SourceConfig};
