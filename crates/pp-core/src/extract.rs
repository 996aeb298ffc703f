//! Extraction of content-hashed bundle filenames from CI log text.
//!
//! The bundler prints a single summary line of the form
//! `Entrypoint main = runtime.<hash>.js main.<hash>.js main.<hash>.css`.
//! Extraction is restricted to that one line, so unrelated log lines that
//! mention similarly named files cannot produce false positives.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::types::BuildRef;

/// Marker identifying the bundler's entry chunk summary line.
const ENTRYPOINT_MARKER: &str = "Entrypoint main";

static RUNTIME_JS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"runtime\.[0-9a-f]+\.js").unwrap());
static MAIN_JS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"main\.[0-9a-f]+\.js").unwrap());
static MAIN_CSS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"main\.[0-9a-f]+\.css").unwrap());

/// Filenames discovered on the entrypoint summary line. All fields are
/// `None` when the line is absent or matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrypointAssets {
    pub runtime_js: Option<String>,
    pub main_js: Option<String>,
    pub main_css: Option<String>,
}

impl EntrypointAssets {
    pub fn is_empty(&self) -> bool {
        self.runtime_js.is_none() && self.main_js.is_none() && self.main_css.is_none()
    }

    /// Attaches the discovered filenames to a PR identifier.
    pub fn into_build_ref(self, pr_id: impl Into<String>) -> BuildRef {
        BuildRef {
            pr_id: pr_id.into(),
            runtime_asset: self.runtime_js,
            main_script_asset: self.main_js,
            main_style_asset: self.main_css,
        }
    }
}

/// Locates the entrypoint summary line in arbitrary multi-line log text and
/// extracts the runtime script, main script and main stylesheet filenames.
/// Never fails; missing pieces are simply absent from the result.
pub fn extract_entrypoint_assets(text: &str) -> EntrypointAssets {
    let Some(line) = text.lines().find(|line| line.contains(ENTRYPOINT_MARKER)) else {
        return EntrypointAssets::default();
    };

    EntrypointAssets {
        runtime_js: RUNTIME_JS_RE.find(line).map(|m| m.as_str().to_string()),
        main_js: MAIN_JS_RE.find(line).map(|m| m.as_str().to_string()),
        main_css: MAIN_CSS_RE.find(line).map(|m| m.as_str().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_all_three_filenames_from_entrypoint_line() {
        let log = "webpack 5.88 compiled\nEntrypoint main = runtime.a1b2.js main.c3d4.js main.c3d4.css\nDone in 42s";
        let assets = extract_entrypoint_assets(log);

        assert_eq!(assets.runtime_js.as_deref(), Some("runtime.a1b2.js"));
        assert_eq!(assets.main_js.as_deref(), Some("main.c3d4.js"));
        assert_eq!(assets.main_css.as_deref(), Some("main.c3d4.css"));
    }

    #[test]
    fn missing_entrypoint_line_yields_nothing() {
        let log = "building...\nemitted runtime.a1b2.js\nemitted main.c3d4.js\ndone";
        assert!(extract_entrypoint_assets(log).is_empty());
    }

    #[test]
    fn ignores_filenames_outside_the_entrypoint_line() {
        let log = "asset main.dead.js 1.2 MiB\nEntrypoint main = main.c3d4.js\nasset runtime.beef.js 4 KiB";
        let assets = extract_entrypoint_assets(log);

        assert_eq!(assets.runtime_js, None);
        assert_eq!(assets.main_js.as_deref(), Some("main.c3d4.js"));
        assert_eq!(assets.main_css, None);
    }

    #[test]
    fn entrypoint_line_without_filenames_yields_nothing() {
        assert!(extract_entrypoint_assets("Entrypoint main [big]").is_empty());
        assert!(extract_entrypoint_assets("").is_empty());
    }

    #[test]
    fn handles_crlf_line_endings() {
        let log = "step 1\r\nEntrypoint main = runtime.ff00aa.js main.12ab.css\r\nstep 2";
        let assets = extract_entrypoint_assets(log);

        assert_eq!(assets.runtime_js.as_deref(), Some("runtime.ff00aa.js"));
        assert_eq!(assets.main_css.as_deref(), Some("main.12ab.css"));
    }

    #[test]
    fn into_build_ref_carries_the_pr_id() {
        let log = "Entrypoint main = main.c3d4.js";
        let build = extract_entrypoint_assets(log).into_build_ref("123");

        assert_eq!(build.pr_id, "123");
        assert!(build.is_actionable());
        assert_eq!(build.main_script_asset.as_deref(), Some("main.c3d4.js"));
        assert_eq!(build.runtime_asset, None);
    }
}
