//! PR Preview Core Library
//!
//! This crate holds the pure, synchronous pieces of the PR preview backend:
//! the shared type definitions, the CI-log filename extractor and the
//! redirect-rule synthesizer. It performs no I/O; everything stateful lives
//! in `pp-coordinator`.
//!
//! # Architecture
//!
//! A tab association table (tab id -> PR build reference) is the single
//! source of truth for which tab previews which PR build. The synthesizer
//! projects that table into a deterministic list of declarative redirect
//! rule descriptors; repeated synthesis from an unchanged table yields a
//! byte-identical rule set.
//!
//! # Modules
//!
//! - `types`: shared type definitions and persisted record layouts
//! - `extract`: bundler "Entrypoint main" log-line filename extraction
//! - `rules`: association table -> redirect rule synthesis
//! - `catalog`: PR -> build catalog with field-wise merge

pub mod catalog;
pub mod extract;
pub mod rules;
pub mod types;

// Re-export commonly used items
pub use catalog::BuildCatalog;
pub use extract::{extract_entrypoint_assets, EntrypointAssets};
pub use rules::{synthesize, Endpoints, MAX_SESSION_RULES, RULE_ID_BASE};
pub use types::{AssetKind, AssociationTable, BuildRef, RedirectRule, ResourceKind, TabId};
