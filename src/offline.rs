//! Service worker registration so the game keeps working offline once loaded.
//! The worker script itself is served by the hosting page.

use js_sys::Reflect;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::{JsFuture, spawn_local};

/// Query flag that skips registration, handy while iterating on assets.
pub const OPT_OUT_FLAG: &str = "nosw=1";

/// Why registration is skipped for this worker URL and page query, if it is.
pub fn skip_reason(worker_url: &str, search: &str) -> Option<&'static str> {
    if worker_url.trim().is_empty() {
        return Some("no worker url configured");
    }
    if search.trim_start_matches('?').split('&').any(|pair| pair == OPT_OUT_FLAG) {
        return Some("disabled via nosw=1");
    }
    None
}

/// Register `worker_url` in the background. Failures are logged, never fatal.
pub fn register(worker_url: &str) {
    let Some(win) = web_sys::window() else {
        return;
    };
    let search = win.location().search().unwrap_or_default();
    if let Some(reason) = skip_reason(worker_url, &search) {
        log::info!("service worker skipped: {reason}");
        return;
    }
    let navigator = win.navigator();
    let supported = Reflect::has(&navigator, &JsValue::from_str("serviceWorker")).unwrap_or(false);
    if !supported {
        log::info!("service worker unsupported");
        return;
    }
    let promise = navigator.service_worker().register(worker_url);
    let url = worker_url.to_string();
    spawn_local(async move {
        match JsFuture::from(promise).await {
            Ok(_) => log::info!("service worker registered: {url}"),
            Err(err) => log::warn!("service worker registration failed for {url}: {err:?}"),
        }
    });
}
