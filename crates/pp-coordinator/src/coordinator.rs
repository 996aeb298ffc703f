//! The tab-scoped redirect-rule lifecycle state machine.
//!
//! The association table is the single source of truth; the active rule set
//! is never patched incrementally. Every mutating transition follows the
//! same protocol: read the full table, compute the new table, persist it,
//! synthesize the full rule list, replace the whole active rule set. That
//! full-replace discipline keeps the rules an exact, deterministic function
//! of the persisted table even across crash-restarts of the background
//! process: no rule can exist for a tab absent from the table, and no
//! tracked tab can lack its rules.
//!
//! Transitions are serialized through one in-process lock, so two events
//! that arrive close together cannot interleave their read-modify-write
//! sequences and silently lose an update. Reads (`query`, `build_for`) take
//! no lock.

use pp_core::rules::{synthesize, Endpoints, MAX_SESSION_RULES};
use pp_core::{AssociationTable, BuildRef, TabId};
use tokio::sync::Mutex;

use crate::config::resolve_infra_url;
use crate::engine::RuleEngine;
use crate::error::CoordinatorError;
use crate::store::StateStore;
use crate::tabs::TabHost;

pub struct Coordinator<S, E, T> {
    store: S,
    engine: E,
    tabs: T,
    endpoints: Endpoints,
    /// Serializes mutating transitions; see the module docs.
    transition: Mutex<()>,
}

impl<S, E, T> Coordinator<S, E, T>
where
    S: StateStore,
    E: RuleEngine,
    T: TabHost,
{
    pub fn new(store: S, engine: E, tabs: T) -> Self {
        Self::with_endpoints(store, engine, tabs, Endpoints::default())
    }

    pub fn with_endpoints(store: S, engine: E, tabs: T, endpoints: Endpoints) -> Self {
        Self {
            store,
            engine,
            tabs,
            endpoints,
            transition: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn tabs(&self) -> &T {
        &self.tabs
    }

    /// Associates a PR build with a tab and installs its redirects.
    ///
    /// With `tab_id` given, the entry strictly supersedes any prior one for
    /// that tab (used when filenames become known after the first call).
    /// Without it, a fresh blank tab is opened, associated, then navigated
    /// to the configured infra host root. Returns the owning tab id.
    pub async fn associate(&self, tab_id: Option<TabId>, build: BuildRef) -> Result<TabId, CoordinatorError> {
        if !build.is_actionable() {
            return Err(CoordinatorError::InvalidRequest(format!(
                "PR {} has no asset filenames",
                build.pr_id
            )));
        }

        let _guard = self.transition.lock().await;
        match tab_id {
            Some(tab_id) => {
                self.upsert_and_install(tab_id, build).await?;
                Ok(tab_id)
            }
            None => {
                let infra_url = resolve_infra_url(&self.store).await.map_err(CoordinatorError::Storage)?;
                let tab_id = self.tabs.create_tab().await.map_err(CoordinatorError::NavigationFailed)?;
                self.upsert_and_install(tab_id, build).await?;
                self.tabs
                    .navigate(tab_id, &format!("{infra_url}/"))
                    .await
                    .map_err(CoordinatorError::NavigationFailed)?;
                Ok(tab_id)
            }
        }
    }

    /// Ends a tab's association and reloads it bypassing the cache. Called
    /// with an untracked (or no) tab this still re-derives the rule set, so
    /// it doubles as a manual resynchronization point.
    pub async fn clear(&self, tab_id: Option<TabId>) -> Result<(), CoordinatorError> {
        let _guard = self.transition.lock().await;
        self.remove_and_install(tab_id).await?;
        if let Some(tab_id) = tab_id {
            self.tabs
                .reload_bypassing_cache(tab_id)
                .await
                .map_err(CoordinatorError::NavigationFailed)?;
        }
        Ok(())
    }

    /// Like [`clear`](Self::clear), but navigates the tab to `clean_url`
    /// (the page's own URL with the preview parameters removed) instead of
    /// reloading in place.
    pub async fn clear_and_navigate(&self, tab_id: TabId, clean_url: &str) -> Result<(), CoordinatorError> {
        let _guard = self.transition.lock().await;
        self.remove_and_install(Some(tab_id)).await?;
        self.tabs
            .navigate(tab_id, clean_url)
            .await
            .map_err(CoordinatorError::NavigationFailed)?;
        Ok(())
    }

    /// Tab-removal path: same as clearing but with no reload (the tab no
    /// longer exists). A no-op for untracked tabs.
    pub async fn tab_closed(&self, tab_id: TabId) -> Result<(), CoordinatorError> {
        let _guard = self.transition.lock().await;
        let mut table = self.load_table().await?;
        if table.remove(tab_id).is_none() {
            return Ok(());
        }
        self.save_table(&table).await?;
        self.install_generation(&table).await
    }

    /// PR identifier currently associated with the tab, if any. Read-only.
    pub async fn query(&self, tab_id: TabId) -> Result<Option<String>, CoordinatorError> {
        let table = self.load_table().await?;
        Ok(table.get(tab_id).map(|build| build.pr_id.clone()))
    }

    /// Clean-slate startup: retire every active rule and reset the table.
    /// Stale redirects surviving an extension update are a silent
    /// correctness hazard, so wiping beats trusting leftovers.
    pub async fn startup(&self) -> Result<(), CoordinatorError> {
        let _guard = self.transition.lock().await;
        let active = self.engine.active_rule_ids().await.map_err(CoordinatorError::PlatformRejected)?;
        if !active.is_empty() {
            self.engine
                .replace(active, Vec::new())
                .await
                .map_err(CoordinatorError::PlatformRejected)?;
        }
        self.save_table(&AssociationTable::new()).await
    }

    /// Records a build discovered on a CI run page, merging field-wise with
    /// anything recorded earlier for the same PR.
    pub async fn record_build(&self, build: BuildRef) -> Result<(), CoordinatorError> {
        if !build.is_actionable() {
            return Err(CoordinatorError::InvalidRequest(format!(
                "PR {} has no asset filenames",
                build.pr_id
            )));
        }
        let _guard = self.transition.lock().await;
        let mut catalog = self.store.load_catalog().await.map_err(CoordinatorError::Storage)?;
        catalog.record(build);
        self.store.save_catalog(&catalog).await.map_err(CoordinatorError::Storage)
    }

    /// Catalog lookup by PR identifier. Read-only.
    pub async fn build_for(&self, pr_id: &str) -> Result<Option<BuildRef>, CoordinatorError> {
        let catalog = self.store.load_catalog().await.map_err(CoordinatorError::Storage)?;
        Ok(catalog.get(pr_id).cloned())
    }

    /// Normalized infra host the next preview tab will be navigated to.
    pub async fn infra_url(&self) -> Result<String, CoordinatorError> {
        resolve_infra_url(&self.store).await.map_err(CoordinatorError::Storage)
    }

    pub async fn set_infra_url(&self, url: &str) -> Result<(), CoordinatorError> {
        let _guard = self.transition.lock().await;
        self.store.set_infra_url(url).await.map_err(CoordinatorError::Storage)
    }

    async fn upsert_and_install(&self, tab_id: TabId, build: BuildRef) -> Result<(), CoordinatorError> {
        log::debug!("associate: tab {tab_id} -> PR {}", build.pr_id);
        let mut table = self.load_table().await?;
        table.upsert(tab_id, build);
        self.save_table(&table).await?;
        self.install_generation(&table).await
    }

    async fn remove_and_install(&self, tab_id: Option<TabId>) -> Result<(), CoordinatorError> {
        let mut table = self.load_table().await?;
        if let Some(tab_id) = tab_id {
            table.remove(tab_id);
            self.save_table(&table).await?;
        }
        self.install_generation(&table).await
    }

    /// Replaces the whole active generation with one synthesized from the
    /// given table. Every currently-active id is retired in the same call
    /// that installs the new rules.
    async fn install_generation(&self, table: &AssociationTable) -> Result<(), CoordinatorError> {
        let rules = synthesize(table, &self.endpoints);
        if rules.len() > MAX_SESSION_RULES {
            log::warn!(
                "synthesized {} rules, above the platform ceiling of {MAX_SESSION_RULES}",
                rules.len()
            );
        }
        let active = self.engine.active_rule_ids().await.map_err(CoordinatorError::PlatformRejected)?;
        self.engine.replace(active, rules).await.map_err(CoordinatorError::PlatformRejected)
    }

    async fn load_table(&self) -> Result<AssociationTable, CoordinatorError> {
        self.store.load_associations().await.map_err(CoordinatorError::Storage)
    }

    async fn save_table(&self, table: &AssociationTable) -> Result<(), CoordinatorError> {
        self.store.save_associations(table).await.map_err(CoordinatorError::Storage)
    }
}
