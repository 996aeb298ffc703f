//! PR Preview Coordinator
//!
//! The tab-scoped redirect-rule lifecycle manager: owns the association
//! table (tab -> PR build), keeps the platform's declarative redirect rules
//! an exact projection of it, and relays the extension's runtime messages
//! onto transitions.
//!
//! Platform capabilities (durable storage, the rule engine, tab control)
//! enter through adapter traits so the same coordinator runs against the
//! browser (via `pp-wasm`) and against in-memory fakes in tests and the CLI
//! simulator.
//!
//! # Modules
//!
//! - `error`: failure taxonomy for transitions
//! - `store`: durable state storage boundary and in-memory implementation
//! - `engine`: declarative rule engine boundary and in-memory implementation
//! - `tabs`: tab host boundary and in-memory implementation
//! - `config`: infra-host configuration record
//! - `coordinator`: the transition state machine
//! - `messages`: runtime message protocol and dispatch relay

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod messages;
pub mod store;
pub mod tabs;

// Re-export commonly used items
pub use config::{normalize_infra_url, resolve_infra_url, DEFAULT_INFRA_URL};
pub use coordinator::Coordinator;
pub use engine::{MemoryRuleEngine, RuleEngine};
pub use error::{CoordinatorError, PlatformError};
pub use messages::{dispatch, Request, Response};
pub use store::{MemoryStore, StateStore};
pub use tabs::{MemoryTabHost, TabEvent, TabHost};
