// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversions and console helpers shared by the exported API.

use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Set panic hook for better error messages in the browser
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Serialize to a plain JS value. Maps become objects, not `Map`s, so the
/// panel can index legends by key.
pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsError::new(&e.to_string()).into())
}

pub(crate) fn core_error(e: site_progress_core::Error) -> JsValue {
    JsError::new(&e.to_string()).into()
}

pub(crate) fn warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}

pub(crate) fn debug(message: &str) {
    web_sys::console::debug_1(&message.into());
}

/// Milliseconds from the page's high resolution clock, falling back to
/// wall-clock time outside a window.
pub(crate) fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

/// Read an optional callback property from an options object.
pub(crate) fn callback(options: &JsValue, name: &str) -> Option<js_sys::Function> {
    if options.is_undefined() || options.is_null() {
        return None;
    }
    js_sys::Reflect::get(options, &name.into())
        .ok()
        .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
}

/// Invoke a panel callback, reporting a throwing callback on the console.
pub(crate) fn notify(callback: Option<&js_sys::Function>, value: &JsValue) {
    if let Some(f) = callback {
        if let Err(e) = f.call1(&JsValue::NULL, value) {
            web_sys::console::warn_2(&"Progress callback threw:".into(), &e);
        }
    }
}
