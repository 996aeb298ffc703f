//! Durable state storage boundary.
//!
//! The association table lives in session-durable storage so it survives
//! restarts of the extension's background process (the platform may kill
//! and restart it at any time); the build catalog and the infra-host
//! override live in local storage. No partial-update API exists: callers
//! always read-modify-write whole records, the coordinator serializes those
//! sequences.

use std::sync::Mutex;

use async_trait::async_trait;
use pp_core::{AssociationTable, BuildCatalog};

use crate::error::PlatformError;

/// Storage record key for the tab association table (session area).
pub const ASSOCIATIONS_KEY: &str = "prTabs";

/// Storage record key for the PR build catalog (local area).
pub const CATALOG_KEY: &str = "prBuilds";

/// Storage record key for the configured infra host (local area).
pub const INFRA_URL_KEY: &str = "defaultInfraUrl";

#[async_trait(?Send)]
pub trait StateStore {
    /// Returns the empty table if the record was never written.
    async fn load_associations(&self) -> Result<AssociationTable, PlatformError>;

    /// Durably replaces the whole table.
    async fn save_associations(&self, table: &AssociationTable) -> Result<(), PlatformError>;

    async fn load_catalog(&self) -> Result<BuildCatalog, PlatformError>;

    async fn save_catalog(&self, catalog: &BuildCatalog) -> Result<(), PlatformError>;

    /// Raw configured infra host, if any; callers normalize.
    async fn infra_url(&self) -> Result<Option<String>, PlatformError>;

    async fn set_infra_url(&self, url: &str) -> Result<(), PlatformError>;
}

/// In-memory store for tests and the CLI simulator.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreState>,
}

#[derive(Debug, Default)]
struct MemoryStoreState {
    associations: AssociationTable,
    catalog: BuildCatalog,
    infra_url: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MemoryStoreState) -> R) -> Result<R, PlatformError> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| PlatformError::new("memory store lock poisoned"))?;
        Ok(f(&mut state))
    }
}

#[async_trait(?Send)]
impl StateStore for MemoryStore {
    async fn load_associations(&self) -> Result<AssociationTable, PlatformError> {
        self.with_state(|state| state.associations.clone())
    }

    async fn save_associations(&self, table: &AssociationTable) -> Result<(), PlatformError> {
        self.with_state(|state| state.associations = table.clone())
    }

    async fn load_catalog(&self) -> Result<BuildCatalog, PlatformError> {
        self.with_state(|state| state.catalog.clone())
    }

    async fn save_catalog(&self, catalog: &BuildCatalog) -> Result<(), PlatformError> {
        self.with_state(|state| state.catalog = catalog.clone())
    }

    async fn infra_url(&self) -> Result<Option<String>, PlatformError> {
        self.with_state(|state| state.infra_url.clone())
    }

    async fn set_infra_url(&self, url: &str) -> Result<(), PlatformError> {
        self.with_state(|state| state.infra_url = Some(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pp_core::BuildRef;

    #[tokio::test]
    async fn load_returns_empty_table_when_never_written() {
        let store = MemoryStore::new();
        assert!(store.load_associations().await.unwrap().is_empty());
        assert!(store.load_catalog().await.unwrap().is_empty());
        assert_eq!(store.infra_url().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_replaces_the_whole_table() {
        let store = MemoryStore::new();

        let mut table = AssociationTable::new();
        let mut build = BuildRef::new("1");
        build.main_script_asset = Some("main.aa.js".to_string());
        table.upsert(4, build);
        store.save_associations(&table).await.unwrap();
        assert_eq!(store.load_associations().await.unwrap(), table);

        store.save_associations(&AssociationTable::new()).await.unwrap();
        assert!(store.load_associations().await.unwrap().is_empty());
    }
}
