use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::pages::leave_dialog::types::LeaveTypeId;

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub api_base_url: Option<String>,
    pub default_leave_type: Option<String>,
}

impl RuntimeConfig {
    fn merge(self, fallback: RuntimeConfig) -> RuntimeConfig {
        RuntimeConfig {
            api_base_url: self.api_base_url.or(fallback.api_base_url),
            default_leave_type: self.default_leave_type.or(fallback.default_leave_type),
        }
    }

    fn is_complete(&self) -> bool {
        self.api_base_url.is_some() && self.default_leave_type.is_some()
    }
}

static API_BASE_URL: OnceLock<String> = OnceLock::new();
static DEFAULT_LEAVE_TYPE: OnceLock<LeaveTypeId> = OnceLock::new();

fn read_global(name: &str) -> RuntimeConfig {
    let Some(window) = web_sys::window() else {
        return RuntimeConfig::default();
    };
    let Ok(any) = js_sys::Reflect::get(&window, &name.into()) else {
        return RuntimeConfig::default();
    };
    if any.is_undefined() || any.is_null() {
        return RuntimeConfig::default();
    }
    let obj = js_sys::Object::from(any);
    // Both upper and lower case keys are accepted.
    let read = |upper: &str, lower: &str| {
        js_sys::Reflect::get(&obj, &upper.into())
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
            .or_else(|| js_sys::Reflect::get(&obj, &lower.into()).ok())
            .and_then(|v| v.as_string())
    };
    RuntimeConfig {
        api_base_url: read("API_BASE_URL", "api_base_url"),
        default_leave_type: read("DEFAULT_LEAVE_TYPE", "default_leave_type"),
    }
}

fn snapshot_from_globals() -> RuntimeConfig {
    // window.__LEAVEDESK_ENV (env.js) takes precedence over window.__LEAVEDESK_CONFIG.
    read_global("__LEAVEDESK_ENV").merge(read_global("__LEAVEDESK_CONFIG"))
}

fn write_window_config(cfg: &RuntimeConfig) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let obj = js_sys::Object::new();
    if let Some(url) = &cfg.api_base_url {
        let _ = js_sys::Reflect::set(
            &obj,
            &"api_base_url".into(),
            &wasm_bindgen::JsValue::from_str(url),
        );
    }
    if let Some(leave_type) = &cfg.default_leave_type {
        let _ = js_sys::Reflect::set(
            &obj,
            &"default_leave_type".into(),
            &wasm_bindgen::JsValue::from_str(leave_type),
        );
    }
    let _ = js_sys::Reflect::set(&window, &"__LEAVEDESK_CONFIG".into(), &obj);
}

async fn fetch_runtime_config() -> anyhow::Result<RuntimeConfig> {
    let origin = web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .ok_or_else(|| anyhow::anyhow!("window origin unavailable"))?;
    let resp = reqwest::get(format!("{}/config.json", origin)).await?;
    if !resp.status().is_success() {
        anyhow::bail!("config.json returned HTTP {}", resp.status());
    }
    Ok(resp.json::<RuntimeConfig>().await?)
}

/// Resolves a configured leave type, falling back to Holiday when the value
/// is missing or not a known type.
pub fn resolve_default_leave_type(raw: Option<&str>) -> LeaveTypeId {
    match raw.map(str::parse::<LeaveTypeId>) {
        Some(Ok(leave_type)) => leave_type,
        Some(Err(err)) => {
            log::warn!("ignoring configured default leave type: {}", err);
            LeaveTypeId::Holiday
        }
        None => LeaveTypeId::Holiday,
    }
}

fn cache(cfg: &RuntimeConfig) -> String {
    let url = cfg
        .api_base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let _ = API_BASE_URL.set(url.clone());
    let _ = DEFAULT_LEAVE_TYPE.set(resolve_default_leave_type(
        cfg.default_leave_type.as_deref(),
    ));
    url
}

pub async fn await_api_base_url() -> String {
    if let Some(cached) = API_BASE_URL.get() {
        return cached.clone();
    }
    let mut cfg = snapshot_from_globals();
    if !cfg.is_complete() {
        match fetch_runtime_config().await {
            Ok(fetched) => {
                write_window_config(&fetched);
                cfg = cfg.merge(fetched);
            }
            Err(err) => log::warn!("runtime config unavailable, using defaults: {}", err),
        }
    }
    cache(&cfg)
}

/// Leave type preselected for new requests. Holiday until `init` has run.
pub fn default_leave_type() -> LeaveTypeId {
    DEFAULT_LEAVE_TYPE
        .get()
        .copied()
        .unwrap_or(LeaveTypeId::Holiday)
}

pub async fn init() {
    let _ = await_api_base_url().await;
}
