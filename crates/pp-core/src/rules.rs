//! Synthesis of the declarative redirect rule set from the association table.
//!
//! The active rule set is always a pure projection of the table: one rule
//! per present asset field per entry, scoped to the owning tab. Synthesis is
//! deterministic (ascending tab id, then runtime/script/style) so repeated
//! synthesis from an unchanged table yields a byte-identical rule set.

use crate::types::{AssetKind, AssociationTable, RedirectRule, TabId};

/// First rule id of every generation.
pub const RULE_ID_BASE: u32 = 1;

/// Priority assigned to every synthesized rule.
pub const RULE_PRIORITY: u32 = 1;

/// Platform ceiling on concurrently installed session rules. The set here
/// is bounded by tracked tabs x 3 and is never expected to approach it; the
/// platform's own error surfaces if it is exceeded.
pub const MAX_SESSION_RULES: usize = 5000;

/// Canonical host serving release builds.
pub const DEFAULT_ASSET_ORIGIN: &str = "https://static.collibra.dev";

/// Path segment under which generic release builds are served.
pub const DEFAULT_RELEASE_PATH: &str = "releases";

/// Path segment under which PR builds are served.
pub const DEFAULT_PR_RELEASE_PATH: &str = "pr-releases";

/// Where generic release assets live and where PR builds are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Origin serving both generic and PR builds, no trailing slash.
    pub asset_origin: String,
    /// `<origin>/<release_path>/<version>/<file>` is the generic layout.
    pub release_path: String,
    /// `<origin>/<pr_release_path>/<pr>/<file>` is the PR build layout.
    pub pr_release_path: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            asset_origin: DEFAULT_ASSET_ORIGIN.to_string(),
            release_path: DEFAULT_RELEASE_PATH.to_string(),
            pr_release_path: DEFAULT_PR_RELEASE_PATH.to_string(),
        }
    }
}

impl Endpoints {
    pub fn with_origin(origin: impl Into<String>) -> Self {
        Self {
            asset_origin: origin.into(),
            ..Self::default()
        }
    }

    /// Regex matching requests for the generic entrypoint filename of the
    /// given kind on the canonical host. Independent of tab and PR; only
    /// the rule's tab scope and redirect target vary per entry.
    pub fn match_pattern(&self, kind: AssetKind) -> String {
        let stem = match kind {
            AssetKind::Runtime => r"runtime\.\w+\.js",
            AssetKind::MainScript => r"main\.\w+\.js",
            AssetKind::MainStyle => r"main\.\w+\.css",
        };
        format!(
            "^{}/{}/[^/]+/{}$",
            regex::escape(&self.asset_origin),
            regex::escape(&self.release_path),
            stem
        )
    }

    /// PR-specific URL a matched request is redirected to.
    pub fn redirect_url(&self, pr_id: &str, filename: &str) -> String {
        format!("{}/{}/{}/{}", self.asset_origin, self.pr_release_path, pr_id, filename)
    }
}

/// Projects the table into a full rule generation. Entries with no asset
/// fields emit nothing. Ids are assigned sequentially from [`RULE_ID_BASE`].
pub fn synthesize(table: &AssociationTable, endpoints: &Endpoints) -> Vec<RedirectRule> {
    let mut rules = Vec::new();
    let mut next_id = RULE_ID_BASE;

    for (tab_id, build) in table.iter() {
        for kind in AssetKind::ALL {
            let Some(filename) = build.asset(kind) else {
                continue;
            };
            rules.push(RedirectRule {
                id: next_id,
                priority: RULE_PRIORITY,
                match_pattern: endpoints.match_pattern(kind),
                resource_kind: kind.resource_kind(),
                redirect_url: endpoints.redirect_url(&build.pr_id, filename),
                tab_id,
            });
            next_id += 1;
        }
    }

    log::debug!("synthesized {} rules for {} tabs", rules.len(), table.len());
    rules
}

/// Rules from `rules` scoped to the given tab.
pub fn rules_for_tab(rules: &[RedirectRule], tab_id: TabId) -> Vec<&RedirectRule> {
    rules.iter().filter(|rule| rule.tab_id == tab_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuildRef, ResourceKind};

    fn build(pr: &str, runtime: Option<&str>, js: Option<&str>, css: Option<&str>) -> BuildRef {
        BuildRef {
            pr_id: pr.to_string(),
            runtime_asset: runtime.map(String::from),
            main_script_asset: js.map(String::from),
            main_style_asset: css.map(String::from),
        }
    }

    #[test]
    fn emits_one_rule_per_present_asset_scoped_to_the_tab() {
        let mut table = AssociationTable::new();
        table.upsert(
            7,
            build("200", Some("runtime.aa11.js"), Some("main.bb22.js"), Some("main.cc33.css")),
        );

        let rules = synthesize(&table, &Endpoints::default());
        assert_eq!(rules.len(), 3);
        assert!(rules.iter().all(|rule| rule.tab_id == 7));
        assert!(rules.iter().all(|rule| rule.priority == RULE_PRIORITY));

        assert_eq!(rules[0].id, RULE_ID_BASE);
        assert_eq!(rules[0].redirect_url, "https://static.collibra.dev/pr-releases/200/runtime.aa11.js");
        assert_eq!(rules[0].resource_kind, ResourceKind::Script);
        assert_eq!(rules[1].redirect_url, "https://static.collibra.dev/pr-releases/200/main.bb22.js");
        assert_eq!(rules[2].redirect_url, "https://static.collibra.dev/pr-releases/200/main.cc33.css");
        assert_eq!(rules[2].resource_kind, ResourceKind::Stylesheet);
    }

    #[test]
    fn match_patterns_target_the_generic_release_paths() {
        let mut table = AssociationTable::new();
        table.upsert(
            1,
            build("18337", Some("runtime.a1.js"), Some("main.b2.js"), Some("main.b2.css")),
        );

        let rules = synthesize(&table, &Endpoints::default());
        assert_eq!(
            rules[0].match_pattern,
            r"^https://static\.collibra\.dev/releases/[^/]+/runtime\.\w+\.js$"
        );
        assert_eq!(
            rules[1].match_pattern,
            r"^https://static\.collibra\.dev/releases/[^/]+/main\.\w+\.js$"
        );
        assert_eq!(
            rules[2].match_pattern,
            r"^https://static\.collibra\.dev/releases/[^/]+/main\.\w+\.css$"
        );
    }

    #[test]
    fn entries_without_assets_emit_no_rules() {
        let mut table = AssociationTable::new();
        table.upsert(3, BuildRef::new("999"));
        assert!(synthesize(&table, &Endpoints::default()).is_empty());
    }

    #[test]
    fn repeated_synthesis_is_byte_identical() {
        let mut table = AssociationTable::new();
        table.upsert(2, build("10", Some("runtime.aa.js"), None, None));
        table.upsert(5, build("11", None, Some("main.bb.js"), Some("main.bb.css")));

        let endpoints = Endpoints::default();
        assert_eq!(synthesize(&table, &endpoints), synthesize(&table, &endpoints));
    }

    #[test]
    fn ordering_is_tab_then_asset_kind() {
        let mut table = AssociationTable::new();
        table.upsert(9, build("2", None, None, Some("main.cc.css")));
        table.upsert(4, build("1", Some("runtime.aa.js"), Some("main.bb.js"), None));

        let rules = synthesize(&table, &Endpoints::default());
        let order: Vec<(TabId, ResourceKind)> =
            rules.iter().map(|rule| (rule.tab_id, rule.resource_kind)).collect();
        assert_eq!(
            order,
            vec![
                (4, ResourceKind::Script),
                (4, ResourceKind::Script),
                (9, ResourceKind::Stylesheet),
            ]
        );
        assert_eq!(rules.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn distinct_tabs_get_disjoint_scopes_and_distinct_targets() {
        let mut table = AssociationTable::new();
        table.upsert(1, build("100", None, Some("main.aa.js"), None));
        table.upsert(2, build("101", None, Some("main.bb.js"), None));

        let rules = synthesize(&table, &Endpoints::default());
        let for_t1 = rules_for_tab(&rules, 1);
        let for_t2 = rules_for_tab(&rules, 2);

        assert_eq!(for_t1.len(), 1);
        assert_eq!(for_t2.len(), 1);
        assert_ne!(for_t1[0].redirect_url, for_t2[0].redirect_url);
        assert!(for_t1[0].redirect_url.contains("/pr-releases/100/"));
        assert!(for_t2[0].redirect_url.contains("/pr-releases/101/"));
    }

    #[test]
    fn custom_origin_is_escaped_into_the_pattern() {
        let mut table = AssociationTable::new();
        table.upsert(1, build("5", Some("runtime.aa.js"), None, None));

        let endpoints = Endpoints::with_origin("https://assets.example.io");
        let rules = synthesize(&table, &endpoints);
        assert_eq!(
            rules[0].match_pattern,
            r"^https://assets\.example\.io/releases/[^/]+/runtime\.\w+\.js$"
        );
        assert_eq!(rules[0].redirect_url, "https://assets.example.io/pr-releases/5/runtime.aa.js");
    }
}
