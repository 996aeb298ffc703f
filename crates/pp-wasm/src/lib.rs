//! WebAssembly bindings for the PR preview background worker.
//!
//! The extension's JS hands the platform capabilities in as callbacks
//! (storage areas, the declarative rule engine, tab control); the
//! coordinator then runs entirely inside the wasm module. Messages from
//! content scripts and the options page are forwarded verbatim as JSON
//! through [`handle_message`].
//!
//! Record payloads cross the boundary as JSON text: the storage callbacks
//! receive and return `JSON.stringify`-ed record values, and `replace_rules`
//! receives the new generation as a JSON array ready for
//! `JSON.parse`.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use js_sys::{Array, Function, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

use pp_core::rules::{synthesize, Endpoints};
use pp_core::{extract_entrypoint_assets, AssociationTable, BuildCatalog, RedirectRule, TabId};
use pp_coordinator::store::{ASSOCIATIONS_KEY, CATALOG_KEY, INFRA_URL_KEY};
use pp_coordinator::{
    dispatch, normalize_infra_url, Coordinator, PlatformError, Request, RuleEngine, StateStore, TabHost,
};

type JsCoordinator = Coordinator<JsStateStore, JsRuleEngine, JsTabHost>;

thread_local! {
    static COORDINATOR: RefCell<Option<Rc<JsCoordinator>>> = RefCell::new(None);
}

/// Platform capability callbacks supplied by the extension's JS.
#[wasm_bindgen]
pub struct PlatformCallbacks {
    storage_get: Function,
    storage_set: Function,
    list_rule_ids: Function,
    replace_rules: Function,
    create_tab: Function,
    update_tab: Function,
    reload_tab: Function,
}

#[wasm_bindgen]
impl PlatformCallbacks {
    /// `storage_get(area, key) -> Promise<string|undefined>`,
    /// `storage_set(area, key, json) -> Promise`,
    /// `list_rule_ids() -> Promise<number[]>`,
    /// `replace_rules(removeIds, rulesJson) -> Promise`,
    /// `create_tab() -> Promise<number>`,
    /// `update_tab(tabId, url) -> Promise`,
    /// `reload_tab(tabId) -> Promise`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        storage_get: Function,
        storage_set: Function,
        list_rule_ids: Function,
        replace_rules: Function,
        create_tab: Function,
        update_tab: Function,
        reload_tab: Function,
    ) -> PlatformCallbacks {
        PlatformCallbacks {
            storage_get,
            storage_set,
            list_rule_ids,
            replace_rules,
            create_tab,
            update_tab,
            reload_tab,
        }
    }
}

#[wasm_bindgen]
pub fn init(callbacks: PlatformCallbacks) -> Result<(), JsValue> {
    COORDINATOR.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            return Err(JsValue::from_str("Already initialized. Reload the worker to reinitialize."));
        }

        let store = JsStateStore {
            get: callbacks.storage_get,
            set: callbacks.storage_set,
        };
        let engine = JsRuleEngine {
            list: callbacks.list_rule_ids,
            replace: callbacks.replace_rules,
        };
        let tabs = JsTabHost {
            create: callbacks.create_tab,
            update: callbacks.update_tab,
            reload: callbacks.reload_tab,
        };

        *slot = Some(Rc::new(Coordinator::new(store, engine, tabs)));
        Ok(())
    })
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    COORDINATOR.with(|slot| slot.borrow().is_some())
}

/// Relays one runtime message (JSON text) onto the coordinator and resolves
/// with the response JSON.
#[wasm_bindgen]
pub fn handle_message(json: String) -> Promise {
    future_to_promise(async move {
        let coordinator = coordinator()?;
        let request: Request = serde_json::from_str(&json).map_err(|e| {
            web_sys::console::warn_1(&JsValue::from_str(&format!("unrecognized message: {e}")));
            JsValue::from_str(&format!("unrecognized message: {e}"))
        })?;
        let response = dispatch(coordinator.as_ref(), request).await;
        let text = serde_json::to_string(&response)
            .map_err(|e| JsValue::from_str(&format!("response serialization failed: {e}")))?;
        Ok(JsValue::from_str(&text))
    })
}

/// Clean-slate hook for `runtime.onInstalled`.
#[wasm_bindgen]
pub fn startup() -> Promise {
    future_to_promise(async move {
        let coordinator = coordinator()?;
        coordinator
            .startup()
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(JsValue::UNDEFINED)
    })
}

/// Hook for `tabs.onRemoved`.
#[wasm_bindgen]
pub fn tab_closed(tab_id: i32) -> Promise {
    future_to_promise(async move {
        let coordinator = coordinator()?;
        coordinator
            .tab_closed(tab_id)
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(JsValue::UNDEFINED)
    })
}

/// Runs the entrypoint-line extractor over scraped log text.
#[wasm_bindgen]
pub fn extract_entrypoint(log_text: &str) -> JsValue {
    let assets = extract_entrypoint_assets(log_text);
    let result = js_sys::Object::new();
    let _ = Reflect::set(&result, &"runtimeJs".into(), &opt_str(assets.runtime_js));
    let _ = Reflect::set(&result, &"mainJs".into(), &opt_str(assets.main_js));
    let _ = Reflect::set(&result, &"mainCss".into(), &opt_str(assets.main_css));
    result.into()
}

#[wasm_bindgen]
pub fn normalize_infra_url_js(raw: &str) -> String {
    normalize_infra_url(Some(raw))
}

/// Synthesizes the rule set for a persisted association table (JSON text),
/// mainly for the options page's diagnostics view.
#[wasm_bindgen]
pub fn synthesize_rules_json(table_json: &str) -> Result<String, JsValue> {
    let table: AssociationTable = serde_json::from_str(table_json)
        .map_err(|e| JsValue::from_str(&format!("invalid table: {e}")))?;
    let rules = synthesize(&table, &Endpoints::default());
    serde_json::to_string(&rules).map_err(|e| JsValue::from_str(&format!("rule serialization failed: {e}")))
}

fn coordinator() -> Result<Rc<JsCoordinator>, JsValue> {
    COORDINATOR
        .with(|slot| slot.borrow().clone())
        .ok_or_else(|| JsValue::from_str("Not initialized; call init() first"))
}

fn opt_str(value: Option<String>) -> JsValue {
    match value {
        Some(text) => JsValue::from_str(&text),
        None => JsValue::NULL,
    }
}

fn platform_err(context: &str, value: JsValue) -> PlatformError {
    let detail = value.as_string().unwrap_or_else(|| format!("{value:?}"));
    PlatformError::new(format!("{context}: {detail}"))
}

/// Calls a JS callback and awaits its return value, resolving promises.
async fn call_js(f: &Function, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let returned = match args {
        [] => f.call0(&JsValue::NULL)?,
        [a] => f.call1(&JsValue::NULL, a)?,
        [a, b] => f.call2(&JsValue::NULL, a, b)?,
        [a, b, c] => f.call3(&JsValue::NULL, a, b, c)?,
        _ => return Err(JsValue::from_str("too many callback arguments")),
    };
    JsFuture::from(Promise::resolve(&returned)).await
}

// =============================================================================
// Storage adapter
// =============================================================================

const SESSION_AREA: &str = "session";
const LOCAL_AREA: &str = "local";

struct JsStateStore {
    get: Function,
    set: Function,
}

impl JsStateStore {
    async fn read_record(&self, area: &str, key: &str) -> Result<Option<String>, PlatformError> {
        let raw = call_js(&self.get, &[JsValue::from_str(area), JsValue::from_str(key)])
            .await
            .map_err(|e| platform_err("storage get", e))?;
        Ok(raw.as_string().filter(|text| !text.is_empty()))
    }

    async fn write_record(&self, area: &str, key: &str, json: &str) -> Result<(), PlatformError> {
        call_js(
            &self.set,
            &[JsValue::from_str(area), JsValue::from_str(key), JsValue::from_str(json)],
        )
        .await
        .map_err(|e| platform_err("storage set", e))?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl StateStore for JsStateStore {
    async fn load_associations(&self) -> Result<AssociationTable, PlatformError> {
        match self.read_record(SESSION_AREA, ASSOCIATIONS_KEY).await? {
            Some(text) => serde_json::from_str(&text)
                .map_err(|e| PlatformError::new(format!("corrupt {ASSOCIATIONS_KEY} record: {e}"))),
            None => Ok(AssociationTable::new()),
        }
    }

    async fn save_associations(&self, table: &AssociationTable) -> Result<(), PlatformError> {
        let json = serde_json::to_string(table)
            .map_err(|e| PlatformError::new(format!("table serialization failed: {e}")))?;
        self.write_record(SESSION_AREA, ASSOCIATIONS_KEY, &json).await
    }

    async fn load_catalog(&self) -> Result<BuildCatalog, PlatformError> {
        match self.read_record(LOCAL_AREA, CATALOG_KEY).await? {
            Some(text) => serde_json::from_str(&text)
                .map_err(|e| PlatformError::new(format!("corrupt {CATALOG_KEY} record: {e}"))),
            None => Ok(BuildCatalog::new()),
        }
    }

    async fn save_catalog(&self, catalog: &BuildCatalog) -> Result<(), PlatformError> {
        let json = serde_json::to_string(catalog)
            .map_err(|e| PlatformError::new(format!("catalog serialization failed: {e}")))?;
        self.write_record(LOCAL_AREA, CATALOG_KEY, &json).await
    }

    async fn infra_url(&self) -> Result<Option<String>, PlatformError> {
        // Bare string record, not JSON
        self.read_record(LOCAL_AREA, INFRA_URL_KEY).await
    }

    async fn set_infra_url(&self, url: &str) -> Result<(), PlatformError> {
        self.write_record(LOCAL_AREA, INFRA_URL_KEY, url).await
    }
}

// =============================================================================
// Rule engine adapter
// =============================================================================

struct JsRuleEngine {
    list: Function,
    replace: Function,
}

#[async_trait(?Send)]
impl RuleEngine for JsRuleEngine {
    async fn active_rule_ids(&self) -> Result<Vec<u32>, PlatformError> {
        let value = call_js(&self.list, &[])
            .await
            .map_err(|e| platform_err("list rule ids", e))?;
        let ids = Array::from(&value)
            .iter()
            .filter_map(|entry| entry.as_f64())
            .map(|id| id as u32)
            .collect();
        Ok(ids)
    }

    async fn replace(&self, remove_ids: Vec<u32>, add_rules: Vec<RedirectRule>) -> Result<(), PlatformError> {
        let remove = Array::new();
        for id in remove_ids {
            remove.push(&JsValue::from_f64(f64::from(id)));
        }
        let rules_json = serde_json::to_string(&add_rules)
            .map_err(|e| PlatformError::new(format!("rule serialization failed: {e}")))?;
        call_js(&self.replace, &[remove.into(), JsValue::from_str(&rules_json)])
            .await
            .map_err(|e| platform_err("replace rules", e))?;
        Ok(())
    }
}

// =============================================================================
// Tab host adapter
// =============================================================================

struct JsTabHost {
    create: Function,
    update: Function,
    reload: Function,
}

#[async_trait(?Send)]
impl TabHost for JsTabHost {
    async fn create_tab(&self) -> Result<TabId, PlatformError> {
        let value = call_js(&self.create, &[])
            .await
            .map_err(|e| platform_err("create tab", e))?;
        value
            .as_f64()
            .map(|id| id as TabId)
            .ok_or_else(|| PlatformError::new("create tab returned no id"))
    }

    async fn navigate(&self, tab_id: TabId, url: &str) -> Result<(), PlatformError> {
        call_js(&self.update, &[JsValue::from(tab_id), JsValue::from_str(url)])
            .await
            .map_err(|e| platform_err("navigate tab", e))?;
        Ok(())
    }

    async fn reload_bypassing_cache(&self, tab_id: TabId) -> Result<(), PlatformError> {
        call_js(&self.reload, &[JsValue::from(tab_id)])
            .await
            .map_err(|e| platform_err("reload tab", e))?;
        Ok(())
    }
}
