//! Catalog of PR builds discovered while scraping CI run pages.
//!
//! A run page may be visited several times while a build is still
//! publishing, each visit contributing a subset of the filenames, so
//! recording merges field-wise instead of replacing. Serialized as the
//! `prBuilds` storage record (PR id -> build reference).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::BuildRef;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildCatalog {
    entries: BTreeMap<String, BuildRef>,
}

impl BuildCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a discovered build. Fields present on `incoming` win; absent
    /// fields keep whatever an earlier visit recorded.
    pub fn record(&mut self, incoming: BuildRef) {
        match self.entries.get_mut(&incoming.pr_id) {
            Some(existing) => existing.merge_from(&incoming),
            None => {
                self.entries.insert(incoming.pr_id.clone(), incoming);
            }
        }
    }

    pub fn get(&self, pr_id: &str) -> Option<&BuildRef> {
        self.entries.get(pr_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
