//! Runtime message protocol between the UI surfaces and the coordinator.
//!
//! Content scripts and the options page talk to the background worker with
//! small `type`-tagged JSON messages; [`dispatch`] is the single relay from
//! those messages onto coordinator transitions. No failure propagates past
//! it: every outcome is folded into a structured response.

use pp_core::{BuildRef, TabId};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_INFRA_URL;
use crate::coordinator::Coordinator;
use crate::engine::RuleEngine;
use crate::error::CoordinatorError;
use crate::store::StateStore;
use crate::tabs::TabHost;

/// Inbound message, tagged by its `type` field on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    /// Open a fresh tab previewing the given PR build.
    #[serde(rename_all = "camelCase")]
    OpenPrBuild {
        pr: String,
        #[serde(default)]
        runtime_js: Option<String>,
        #[serde(default)]
        main_js: Option<String>,
        #[serde(default)]
        main_css: Option<String>,
    },
    /// Associate the sending tab with a PR build.
    #[serde(rename_all = "camelCase")]
    PreparePrRedirects {
        tab_id: TabId,
        pr: String,
        #[serde(default)]
        runtime_js: Option<String>,
        #[serde(default)]
        main_js: Option<String>,
        #[serde(default)]
        main_css: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    GetPrForTab { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    ClearPrBuild {
        #[serde(default)]
        tab_id: Option<TabId>,
    },
    #[serde(rename_all = "camelCase")]
    ClearPrRedirectsAndReload {
        tab_id: TabId,
        #[serde(default)]
        clean_url: Option<String>,
    },
    /// Record a build discovered on a CI run page.
    #[serde(rename_all = "camelCase")]
    RecordBuild {
        pr: String,
        #[serde(default)]
        runtime_js: Option<String>,
        #[serde(default)]
        main_js: Option<String>,
        #[serde(default)]
        main_css: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    GetBuildForPr { pr: String },
    GetInfraUrl,
    SetInfraUrl { url: String },
}

/// Outbound response; shape depends on the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ack { ok: bool },
    Pr { pr: Option<String> },
    Build { build: Option<BuildRef> },
    Url { url: String },
}

impl Response {
    pub fn ok() -> Self {
        Response::Ack { ok: true }
    }

    pub fn failed() -> Self {
        Response::Ack { ok: false }
    }
}

/// Relays one message onto the coordinator. Failures are logged and folded
/// into the response, never raised.
pub async fn dispatch<S, E, T>(coordinator: &Coordinator<S, E, T>, request: Request) -> Response
where
    S: StateStore,
    E: RuleEngine,
    T: TabHost,
{
    match request {
        Request::OpenPrBuild { pr, runtime_js, main_js, main_css } => {
            let build = build_ref(pr, runtime_js, main_js, main_css);
            ack(coordinator.associate(None, build).await.map(|_| ()))
        }
        Request::PreparePrRedirects { tab_id, pr, runtime_js, main_js, main_css } => {
            let build = build_ref(pr, runtime_js, main_js, main_css);
            ack(coordinator.associate(Some(tab_id), build).await.map(|_| ()))
        }
        Request::GetPrForTab { tab_id } => match coordinator.query(tab_id).await {
            Ok(pr) => Response::Pr { pr },
            Err(err) => {
                log::warn!("query for tab {tab_id} failed: {err}");
                Response::Pr { pr: None }
            }
        },
        Request::ClearPrBuild { tab_id } => ack(coordinator.clear(tab_id).await),
        Request::ClearPrRedirectsAndReload { tab_id, clean_url } => match clean_url {
            Some(url) => ack(coordinator.clear_and_navigate(tab_id, &url).await),
            None => ack(coordinator.clear(Some(tab_id)).await),
        },
        Request::RecordBuild { pr, runtime_js, main_js, main_css } => {
            let build = build_ref(pr, runtime_js, main_js, main_css);
            ack(coordinator.record_build(build).await)
        }
        Request::GetBuildForPr { pr } => match coordinator.build_for(&pr).await {
            Ok(build) => Response::Build { build },
            Err(err) => {
                log::warn!("catalog lookup for PR {pr} failed: {err}");
                Response::Build { build: None }
            }
        },
        Request::GetInfraUrl => match coordinator.infra_url().await {
            Ok(url) => Response::Url { url },
            Err(err) => {
                log::warn!("infra url lookup failed: {err}");
                Response::Url { url: DEFAULT_INFRA_URL.to_string() }
            }
        },
        Request::SetInfraUrl { url } => ack(coordinator.set_infra_url(&url).await),
    }
}

fn ack(result: Result<(), CoordinatorError>) -> Response {
    match result {
        Ok(()) => Response::ok(),
        Err(err) => {
            log::warn!("transition failed: {err}");
            Response::failed()
        }
    }
}

/// Empty strings on the wire count as absent filenames.
fn build_ref(pr: String, runtime_js: Option<String>, main_js: Option<String>, main_css: Option<String>) -> BuildRef {
    fn present(value: Option<String>) -> Option<String> {
        value.filter(|s| !s.trim().is_empty())
    }
    BuildRef {
        pr_id: pr,
        runtime_asset: present(runtime_js),
        main_script_asset: present(main_js),
        main_style_asset: present(main_css),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryRuleEngine;
    use crate::store::MemoryStore;
    use crate::tabs::MemoryTabHost;

    fn coordinator() -> Coordinator<MemoryStore, MemoryRuleEngine, MemoryTabHost> {
        Coordinator::new(MemoryStore::new(), MemoryRuleEngine::new(), MemoryTabHost::new())
    }

    #[test]
    fn requests_parse_from_wire_json() {
        let request: Request = serde_json::from_str(
            r#"{"type":"openPrBuild","pr":"18337","runtimeJs":"runtime.a1.js","mainJs":"main.b2.js"}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            Request::OpenPrBuild {
                pr: "18337".to_string(),
                runtime_js: Some("runtime.a1.js".to_string()),
                main_js: Some("main.b2.js".to_string()),
                main_css: None,
            }
        );

        let request: Request = serde_json::from_str(r#"{"type":"getPrForTab","tabId":7}"#).unwrap();
        assert_eq!(request, Request::GetPrForTab { tab_id: 7 });

        let request: Request = serde_json::from_str(r#"{"type":"clearPrBuild"}"#).unwrap();
        assert_eq!(request, Request::ClearPrBuild { tab_id: None });
    }

    #[test]
    fn responses_serialize_to_the_wire_shapes() {
        assert_eq!(serde_json::to_string(&Response::ok()).unwrap(), r#"{"ok":true}"#);
        assert_eq!(
            serde_json::to_string(&Response::Pr { pr: Some("42".to_string()) }).unwrap(),
            r#"{"pr":"42"}"#
        );
        assert_eq!(serde_json::to_string(&Response::Pr { pr: None }).unwrap(), r#"{"pr":null}"#);
    }

    #[tokio::test]
    async fn open_then_query_then_clear_round_trip() {
        let c = coordinator();

        let response = dispatch(
            &c,
            Request::OpenPrBuild {
                pr: "123".to_string(),
                runtime_js: None,
                main_js: Some("main.abc.js".to_string()),
                main_css: None,
            },
        )
        .await;
        assert_eq!(response, Response::ok());

        let response = dispatch(&c, Request::GetPrForTab { tab_id: 1 }).await;
        assert_eq!(response, Response::Pr { pr: Some("123".to_string()) });

        let response = dispatch(&c, Request::ClearPrBuild { tab_id: Some(1) }).await;
        assert_eq!(response, Response::ok());
        assert_eq!(dispatch(&c, Request::GetPrForTab { tab_id: 1 }).await, Response::Pr { pr: None });
    }

    #[tokio::test]
    async fn associate_with_no_assets_acks_false() {
        let c = coordinator();
        let response = dispatch(
            &c,
            Request::OpenPrBuild {
                pr: "123".to_string(),
                runtime_js: None,
                main_js: Some("  ".to_string()),
                main_css: Some(String::new()),
            },
        )
        .await;
        assert_eq!(response, Response::failed());
        assert!(c.store().load_associations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn infra_url_round_trips_through_messages() {
        let c = coordinator();
        assert_eq!(
            dispatch(&c, Request::GetInfraUrl).await,
            Response::Url { url: DEFAULT_INFRA_URL.to_string() }
        );

        let response = dispatch(
            &c,
            Request::SetInfraUrl { url: "https://infra-pr.collibra.dev/".to_string() },
        )
        .await;
        assert_eq!(response, Response::ok());
        assert_eq!(
            dispatch(&c, Request::GetInfraUrl).await,
            Response::Url { url: "https://infra-pr.collibra.dev".to_string() }
        );
    }

    #[tokio::test]
    async fn record_and_fetch_a_catalog_entry() {
        let c = coordinator();
        let response = dispatch(
            &c,
            Request::RecordBuild {
                pr: "300".to_string(),
                runtime_js: Some("runtime.aa.js".to_string()),
                main_js: None,
                main_css: None,
            },
        )
        .await;
        assert_eq!(response, Response::ok());

        match dispatch(&c, Request::GetBuildForPr { pr: "300".to_string() }).await {
            Response::Build { build: Some(build) } => {
                assert_eq!(build.runtime_asset.as_deref(), Some("runtime.aa.js"));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
