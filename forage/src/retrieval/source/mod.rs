//! Protocol adapter implementations.
//!
//! Only the generic web backend ships in-tree; issue trackers, wikis and chat
//! backends plug in through the same [`ProtocolAdapter`] contract.
//!
//! [`ProtocolAdapter`]: super::ProtocolAdapter

pub mod mock;
pub mod web;

pub use mock::MockAdapter;
pub use web::WebAdapter;
