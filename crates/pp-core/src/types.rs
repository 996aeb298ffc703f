//! Shared type definitions for the PR preview backend.
//!
//! These types map directly to the extension's persisted storage records
//! and to the platform's declarative redirect rule shape, and are used
//! throughout the coordinator and the bindings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Platform-assigned tab identifier. Unique for the tab's lifetime; the
/// platform never reuses an identifier within a browser session.
pub type TabId = i32;

// =============================================================================
// Asset kinds
// =============================================================================

/// Asset slots a PR build can override, in synthesis order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetKind {
    /// Bundler runtime chunk (`runtime.<hash>.js`)
    Runtime,
    /// Main entry script (`main.<hash>.js`)
    MainScript,
    /// Main stylesheet (`main.<hash>.css`)
    MainStyle,
}

impl AssetKind {
    /// All kinds in the fixed synthesis order.
    pub const ALL: [AssetKind; 3] = [AssetKind::Runtime, AssetKind::MainScript, AssetKind::MainStyle];

    /// Platform resource type the redirect rule condition must name.
    pub fn resource_kind(self) -> ResourceKind {
        match self {
            AssetKind::Runtime | AssetKind::MainScript => ResourceKind::Script,
            AssetKind::MainStyle => ResourceKind::Stylesheet,
        }
    }
}

/// Request resource type a rule is conditioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Script,
    Stylesheet,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Script => "script",
            ResourceKind::Stylesheet => "stylesheet",
        }
    }
}

// =============================================================================
// Build references
// =============================================================================

/// One PR's build: the PR identifier plus the content-hashed filenames its
/// bundle produced. At least one asset field must be present for the
/// reference to be actionable. Replaced wholesale on re-association; only
/// the catalog's merge step ever combines two references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRef {
    pub pr_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_asset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_script_asset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_style_asset: Option<String>,
}

impl BuildRef {
    pub fn new(pr_id: impl Into<String>) -> Self {
        Self {
            pr_id: pr_id.into(),
            runtime_asset: None,
            main_script_asset: None,
            main_style_asset: None,
        }
    }

    /// True when at least one asset filename is known.
    pub fn is_actionable(&self) -> bool {
        self.runtime_asset.is_some() || self.main_script_asset.is_some() || self.main_style_asset.is_some()
    }

    pub fn asset(&self, kind: AssetKind) -> Option<&str> {
        match kind {
            AssetKind::Runtime => self.runtime_asset.as_deref(),
            AssetKind::MainScript => self.main_script_asset.as_deref(),
            AssetKind::MainStyle => self.main_style_asset.as_deref(),
        }
    }

    /// Field-wise merge: fields present on `incoming` win, absent fields
    /// keep their current value. The PR identifier is not changed.
    pub fn merge_from(&mut self, incoming: &BuildRef) {
        if incoming.runtime_asset.is_some() {
            self.runtime_asset = incoming.runtime_asset.clone();
        }
        if incoming.main_script_asset.is_some() {
            self.main_script_asset = incoming.main_script_asset.clone();
        }
        if incoming.main_style_asset.is_some() {
            self.main_style_asset = incoming.main_style_asset.clone();
        }
    }
}

// =============================================================================
// Association table
// =============================================================================

/// Mapping from tab identifier to the PR build currently previewed in that
/// tab. A tab appears at most once; an ended association is removed, never
/// left as an empty placeholder. Serialized as a JSON object with string
/// tab-id keys (the `prTabs` storage record layout).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssociationTable {
    entries: BTreeMap<TabId, BuildRef>,
}

impl AssociationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tab_id: TabId) -> Option<&BuildRef> {
        self.entries.get(&tab_id)
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.entries.contains_key(&tab_id)
    }

    /// Inserts or wholesale-replaces the entry for `tab_id`.
    pub fn upsert(&mut self, tab_id: TabId, build: BuildRef) {
        self.entries.insert(tab_id, build);
    }

    pub fn remove(&mut self, tab_id: TabId) -> Option<BuildRef> {
        self.entries.remove(&tab_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending tab-id order.
    pub fn iter(&self) -> impl Iterator<Item = (TabId, &BuildRef)> + '_ {
        self.entries.iter().map(|(tab_id, build)| (*tab_id, build))
    }
}

// =============================================================================
// Redirect rules
// =============================================================================

/// One declarative redirect rule descriptor, derived from a single asset
/// field of a single table entry and scoped to exactly the owning tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRule {
    /// Process-assigned id, fresh each generation.
    pub id: u32,
    pub priority: u32,
    /// Origin- and path-qualified regex over the generic release asset path.
    pub match_pattern: String,
    pub resource_kind: ResourceKind,
    /// PR-specific build URL the matched request is redirected to.
    pub redirect_url: String,
    /// The one tab this rule applies to.
    pub tab_id: TabId,
}
