//! Tab host boundary: creation, navigation, reload.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use pp_core::TabId;

use crate::error::PlatformError;

#[async_trait(?Send)]
pub trait TabHost {
    /// Opens a new blank tab and returns its identifier.
    async fn create_tab(&self) -> Result<TabId, PlatformError>;

    async fn navigate(&self, tab_id: TabId, url: &str) -> Result<(), PlatformError>;

    /// Reloads the tab bypassing the HTTP cache, so a just-removed redirect
    /// does not linger in cached responses.
    async fn reload_bypassing_cache(&self, tab_id: TabId) -> Result<(), PlatformError>;
}

/// Something the in-memory tab host was asked to do, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    Created(TabId),
    Navigated(TabId, String),
    Reloaded(TabId),
}

/// In-memory tab host for tests and the CLI simulator. Hands out ascending
/// tab ids starting at 1 and records every request made of it.
#[derive(Debug)]
pub struct MemoryTabHost {
    next_id: AtomicI32,
    events: Mutex<Vec<TabEvent>>,
    fail_next_navigation: AtomicBool,
}

impl Default for MemoryTabHost {
    fn default() -> Self {
        Self {
            next_id: AtomicI32::new(1),
            events: Mutex::new(Vec::new()),
            fail_next_navigation: AtomicBool::new(false),
        }
    }
}

impl MemoryTabHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TabEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Makes the next navigation or reload call fail.
    pub fn fail_next_navigation(&self) {
        self.fail_next_navigation.store(true, Ordering::SeqCst);
    }

    fn record(&self, event: TabEvent) -> Result<(), PlatformError> {
        self.events
            .lock()
            .map_err(|_| PlatformError::new("tab host lock poisoned"))?
            .push(event);
        Ok(())
    }
}

#[async_trait(?Send)]
impl TabHost for MemoryTabHost {
    async fn create_tab(&self) -> Result<TabId, PlatformError> {
        let tab_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.record(TabEvent::Created(tab_id))?;
        Ok(tab_id)
    }

    async fn navigate(&self, tab_id: TabId, url: &str) -> Result<(), PlatformError> {
        if self.fail_next_navigation.swap(false, Ordering::SeqCst) {
            return Err(PlatformError::new(format!("tab {tab_id} unavailable")));
        }
        self.record(TabEvent::Navigated(tab_id, url.to_string()))
    }

    async fn reload_bypassing_cache(&self, tab_id: TabId) -> Result<(), PlatformError> {
        if self.fail_next_navigation.swap(false, Ordering::SeqCst) {
            return Err(PlatformError::new(format!("tab {tab_id} unavailable")));
        }
        self.record(TabEvent::Reloaded(tab_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hands_out_ascending_tab_ids() {
        let tabs = MemoryTabHost::new();
        assert_eq!(tabs.create_tab().await.unwrap(), 1);
        assert_eq!(tabs.create_tab().await.unwrap(), 2);

        tabs.navigate(2, "https://infra-main.collibra.dev/").await.unwrap();
        assert_eq!(
            tabs.events(),
            vec![
                TabEvent::Created(1),
                TabEvent::Created(2),
                TabEvent::Navigated(2, "https://infra-main.collibra.dev/".to_string()),
            ]
        );
    }
}
