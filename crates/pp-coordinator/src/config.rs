//! Infra-host configuration record.
//!
//! The options page stores a single URL string; everything else reads it
//! through [`resolve_infra_url`], which falls back to the built-in default
//! and normalizes trailing slashes.

use crate::error::PlatformError;
use crate::store::StateStore;

/// Infra host used when no override is configured.
pub const DEFAULT_INFRA_URL: &str = "https://infra-main.collibra.dev";

/// Trims the configured value and strips trailing slashes; empty or unset
/// values fall back to the default.
pub fn normalize_infra_url(raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or("");
    let base = if trimmed.is_empty() { DEFAULT_INFRA_URL } else { trimmed };
    base.trim_end_matches('/').to_string()
}

/// Reads the configured infra host and normalizes it.
pub async fn resolve_infra_url<S: StateStore + ?Sized>(store: &S) -> Result<String, PlatformError> {
    let configured = store.infra_url().await?;
    Ok(normalize_infra_url(configured.as_deref()))
}
