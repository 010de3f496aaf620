// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge tests against a scripted host object. Run with `wasm-pack test --node`.

#![cfg(target_arch = "wasm32")]

use site_progress_core::{ColorState, ObjectSelector, Rgb, ViewerBridge};
use site_progress_wasm::{HostViewer, JsViewer};
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::*;

/// A host with two models where `guid-a` lives in `m1` as runtime id 7.
fn scripted_host() -> HostViewer {
    let host = js_sys::Function::new_no_args(
        r#"
        const calls = [];
        return {
            calls,
            getModels: () => [{ id: "m1", name: "Precast" }, { id: "m2" }],
            getObjects: (modelId) => Promise.resolve(modelId === "m1" ? [7, 8] : [9]),
            convertToObjectRuntimeIds: (modelId, guids) =>
                guids.map((g) => (modelId === "m1" && g === "guid-a" ? 7 : null)),
            convertToObjectIds: (modelId, ids) => ids.map((id) => (id === 7 ? "guid-a" : undefined)),
            setObjectState: (selector, state) => { calls.push({ selector, state }); },
            getSelection: () => [{ modelId: "m1", objectRuntimeIds: [7] }],
            setSelection: () => {},
            setCamera: () => {},
            getSettings: () => ({ assemblySelection: false }),
            setSettings: () => { throw new Error("read-only"); },
        };
        "#,
    )
    .call0(&JsValue::NULL)
    .unwrap();
    host.unchecked_into()
}

#[wasm_bindgen_test]
async fn decodes_models_and_lookups() {
    let viewer = JsViewer::new(scripted_host());

    let models = viewer.get_models().await.unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].name.as_deref(), Some("Precast"));
    assert_eq!(models[1].name, None);

    let ids = viewer
        .convert_to_runtime_ids("m1", &["guid-a".to_string(), "guid-b".to_string()])
        .await
        .unwrap();
    assert_eq!(ids, vec![Some(7), None]);

    let guids = viewer.convert_to_object_ids("m1", &[7, 8]).await.unwrap();
    assert_eq!(guids, vec![Some("guid-a".to_string()), None]);

    assert_eq!(viewer.list_objects("m1").await.unwrap(), vec![7, 8]);
}

#[wasm_bindgen_test]
async fn reset_and_color_reach_the_host() {
    let host = scripted_host();
    let calls: js_sys::Array = js_sys::Reflect::get(&host, &"calls".into()).unwrap().unchecked_into();
    let viewer = JsViewer::new(host);

    viewer.set_object_state(&ObjectSelector::All, ColorState::Reset).await.unwrap();
    viewer
        .set_object_state(
            &ObjectSelector::single("m1", vec![7]),
            ColorState::Color(Rgb::new(34, 197, 94)),
        )
        .await
        .unwrap();

    assert_eq!(calls.length(), 2);
    let first = calls.get(0);
    assert!(js_sys::Reflect::get(&first, &"selector".into()).unwrap().is_undefined());
    let state = js_sys::Reflect::get(&calls.get(1), &"state".into()).unwrap();
    let color = js_sys::Reflect::get(&state, &"color".into()).unwrap();
    assert_eq!(color.as_string().as_deref(), Some("#22c55e"));
}

#[wasm_bindgen_test]
async fn host_exceptions_become_viewer_errors() {
    let viewer = JsViewer::new(scripted_host());
    assert!(!viewer.assembly_selection().await.unwrap());

    let err = viewer.set_assembly_selection(true).await.unwrap_err();
    assert!(err.to_string().contains("setSettings failed: read-only"));
}
