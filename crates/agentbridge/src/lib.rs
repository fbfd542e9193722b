//! Provider-agnostic mediation layer for conversational AI chat APIs: a
//! dialect-neutral intermediate representation, frontend/backend adapter
//! contracts, an around-advice middleware stack, a composing `Bridge`, and a
//! `Router` that multiplexes across backends with fallback and a circuit
//! breaker. See each module's doc comment for the part of the design it
//! covers.

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod events;
pub mod ir;
pub mod middleware;
pub mod router;
pub mod stats;

pub use bridge::Bridge;
pub use config::{BridgeConfig, RouterConfig};
pub use events::{Event, EventEmitter};
pub use router::Router;
