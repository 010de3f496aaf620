// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stateless GUID and color helpers for the panel.

use wasm_bindgen::prelude::*;

use crate::utils::{core_error, to_js};

/// Strip `urn:uuid:` and surrounding whitespace.
#[wasm_bindgen(js_name = normalizeGuid)]
pub fn normalize_guid(raw: &str) -> String {
    site_progress_core::normalize_guid(raw)
}

/// `"IFC"`, `"MS"` or `"UNKNOWN"`.
#[wasm_bindgen(js_name = classifyGuid)]
pub fn classify_guid(raw: &str) -> String {
    site_progress_core::classify_guid(raw).as_str().to_string()
}

/// Expand a 22-character IFC GlobalId to `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
#[wasm_bindgen(js_name = ifcToUuid)]
pub fn ifc_to_uuid(ifc: &str) -> Result<String, JsValue> {
    site_progress_core::ifc_to_uuid(ifc).map_err(core_error)
}

#[wasm_bindgen(js_name = uuidToIfc)]
pub fn uuid_to_ifc(uuid: &str) -> Result<String, JsValue> {
    site_progress_core::uuid_to_ifc(uuid).map_err(core_error)
}

/// Map each distinct date key to a `#rrggbb` color. Input order does not
/// matter.
#[wasm_bindgen(js_name = generateDateColors)]
pub fn generate_date_colors(dates: Vec<String>) -> Result<JsValue, JsValue> {
    let colors: std::collections::BTreeMap<String, String> =
        site_progress_core::generate_date_colors(&dates)
            .into_iter()
            .map(|(key, rgb)| (key, rgb.to_hex()))
            .collect();
    to_js(&colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_names_match_panel_labels() {
        assert_eq!(classify_guid("urn:uuid:550e8400-e29b-41d4-a716-446655440000"), "MS");
        assert_eq!(classify_guid("1a2B3c4D5e6F7g8H9i0Jkl"), "IFC");
        assert_eq!(classify_guid("not-a-guid"), "UNKNOWN");
    }

    #[test]
    fn conversions_round_trip() {
        let uuid = ifc_to_uuid("1L3eG0ufj1rASMH6PLH000").ok();
        assert_eq!(uuid.as_deref(), Some("550e8400-e29b-41d4-a716-446655440000"));
        assert_eq!(
            uuid_to_ifc("550e8400-e29b-41d4-a716-446655440000").ok().as_deref(),
            Some("1L3eG0ufj1rASMH6PLH000")
        );
    }

    #[test]
    fn normalize_strips_prefix() {
        assert_eq!(normalize_guid("  URN:UUID:abc "), "abc");
    }
}
