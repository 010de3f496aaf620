// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapter from the host viewer's JavaScript API to [`ViewerBridge`].
//!
//! The panel hands in an object with these methods; each may return a
//! value or a promise:
//!
//! ```text
//! getModels()                                   -> [{ id, name? }]
//! getObjects(modelId)                           -> [runtimeId]
//! convertToObjectRuntimeIds(modelId, [guid])    -> [runtimeId | null]
//! convertToObjectIds(modelId, [runtimeId])      -> [guid | null]
//! setObjectState(selector | undefined, { color })
//! getSelection()                                -> [{ modelId, objectRuntimeIds }]
//! setSelection(selector)
//! setCamera(selector)
//! getSettings()                                 -> { assemblySelection }
//! setSettings({ assemblySelection })
//! ```
//!
//! A selector is `{ modelObjectIds: [{ modelId, objectRuntimeIds }] }`;
//! `undefined` stands for every object, and `color: "reset"` restores the
//! model colors. This module is the only place that looks at untyped values.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use site_progress_core::{
    ColorState, Error as CoreError, ModelInfo, ModelObjects, ObjectSelector, Result, RuntimeId,
    ViewerBridge,
};
use thiserror::Error;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    /// The host viewer object supplied by the panel.
    #[wasm_bindgen(typescript_type = "ProgressViewerHost")]
    pub type HostViewer;

    #[wasm_bindgen(method, catch, js_name = getModels)]
    fn get_models(this: &HostViewer) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = getObjects)]
    fn get_objects(this: &HostViewer, model_id: &str) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = convertToObjectRuntimeIds)]
    fn convert_to_object_runtime_ids(
        this: &HostViewer,
        model_id: &str,
        guids: JsValue,
    ) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = convertToObjectIds)]
    fn convert_to_object_ids(
        this: &HostViewer,
        model_id: &str,
        runtime_ids: JsValue,
    ) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = setObjectState)]
    fn set_object_state(
        this: &HostViewer,
        selector: JsValue,
        state: JsValue,
    ) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = getSelection)]
    fn get_selection(this: &HostViewer) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = setSelection)]
    fn set_selection(this: &HostViewer, selector: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = setCamera)]
    fn set_camera(this: &HostViewer, selector: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = getSettings)]
    fn get_settings(this: &HostViewer) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = setSettings)]
    fn set_settings(this: &HostViewer, settings: JsValue) -> std::result::Result<JsValue, JsValue>;
}

/// Failure talking to the host viewer.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("{method} failed: {message}")]
    Call {
        method: &'static str,
        message: String,
    },

    #[error("{method} returned an unexpected value: {source}")]
    Shape {
        method: &'static str,
        source: serde_wasm_bindgen::Error,
    },

    #[error("could not encode arguments for {method}: {source}")]
    Encode {
        method: &'static str,
        source: serde_wasm_bindgen::Error,
    },
}

impl From<BridgeError> for CoreError {
    fn from(e: BridgeError) -> Self {
        CoreError::Viewer(e.to_string())
    }
}

/// Best-effort text of a thrown JS value.
fn describe(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsModelObjects {
    model_id: String,
    #[serde(default)]
    object_runtime_ids: Vec<RuntimeId>,
}

impl From<&ModelObjects> for JsModelObjects {
    fn from(group: &ModelObjects) -> Self {
        Self {
            model_id: group.model_id.clone(),
            object_runtime_ids: group.runtime_ids.clone(),
        }
    }
}

impl From<JsModelObjects> for ModelObjects {
    fn from(group: JsModelObjects) -> Self {
        Self {
            model_id: group.model_id,
            runtime_ids: group.object_runtime_ids,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsSelector {
    model_object_ids: Vec<JsModelObjects>,
}

#[derive(Debug, Serialize)]
struct JsObjectState {
    color: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsSettings {
    #[serde(default)]
    assembly_selection: bool,
}

/// [`ViewerBridge`] over a [`HostViewer`].
pub struct JsViewer {
    host: HostViewer,
}

impl JsViewer {
    pub fn new(host: HostViewer) -> Self {
        Self { host }
    }

    /// Settle a host call that may have returned a plain value or a promise.
    async fn settle(
        method: &'static str,
        call: std::result::Result<JsValue, JsValue>,
    ) -> std::result::Result<JsValue, BridgeError> {
        let returned = call.map_err(|e| BridgeError::Call {
            method,
            message: describe(&e),
        })?;
        let promise = js_sys::Promise::resolve(&returned);
        JsFuture::from(promise).await.map_err(|e| BridgeError::Call {
            method,
            message: describe(&e),
        })
    }

    async fn call_as<T: DeserializeOwned>(
        method: &'static str,
        call: std::result::Result<JsValue, JsValue>,
    ) -> std::result::Result<T, BridgeError> {
        let value = Self::settle(method, call).await?;
        serde_wasm_bindgen::from_value(value).map_err(|source| BridgeError::Shape { method, source })
    }

    fn encode<T: Serialize + ?Sized>(method: &'static str, value: &T) -> std::result::Result<JsValue, BridgeError> {
        serde_wasm_bindgen::to_value(value).map_err(|source| BridgeError::Encode { method, source })
    }
}

fn selector_value(method: &'static str, selector: &ObjectSelector) -> std::result::Result<JsValue, BridgeError> {
    match selector {
        ObjectSelector::All => Ok(JsValue::UNDEFINED),
        ObjectSelector::Objects(groups) => JsViewer::encode(method, &js_selector(groups)),
    }
}

fn js_selector(groups: &[ModelObjects]) -> JsSelector {
    JsSelector {
        model_object_ids: groups.iter().map(JsModelObjects::from).collect(),
    }
}

fn js_object_state(color: ColorState) -> JsObjectState {
    JsObjectState {
        color: match color {
            ColorState::Reset => "reset".to_string(),
            ColorState::Color(rgb) => rgb.to_hex(),
        },
    }
}

impl ViewerBridge for JsViewer {
    async fn get_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(Self::call_as("getModels", self.host.get_models()).await?)
    }

    async fn list_objects(&self, model_id: &str) -> Result<Vec<RuntimeId>> {
        Ok(Self::call_as("getObjects", self.host.get_objects(model_id)).await?)
    }

    async fn convert_to_runtime_ids(
        &self,
        model_id: &str,
        guids: &[String],
    ) -> Result<Vec<Option<RuntimeId>>> {
        const METHOD: &str = "convertToObjectRuntimeIds";
        let guids = Self::encode(METHOD, guids)?;
        let ids: Vec<Option<RuntimeId>> =
            Self::call_as(METHOD, self.host.convert_to_object_runtime_ids(model_id, guids)).await?;
        Ok(ids)
    }

    async fn convert_to_object_ids(
        &self,
        model_id: &str,
        runtime_ids: &[RuntimeId],
    ) -> Result<Vec<Option<String>>> {
        const METHOD: &str = "convertToObjectIds";
        let runtime_ids = Self::encode(METHOD, runtime_ids)?;
        let guids: Vec<Option<String>> =
            Self::call_as(METHOD, self.host.convert_to_object_ids(model_id, runtime_ids)).await?;
        Ok(guids)
    }

    async fn set_object_state(&self, selector: &ObjectSelector, color: ColorState) -> Result<()> {
        const METHOD: &str = "setObjectState";
        let selector = selector_value(METHOD, selector)?;
        let state = Self::encode(METHOD, &js_object_state(color))?;
        Self::settle(METHOD, self.host.set_object_state(selector, state)).await?;
        Ok(())
    }

    async fn get_selection(&self) -> Result<Vec<ModelObjects>> {
        let groups: Vec<JsModelObjects> =
            Self::call_as("getSelection", self.host.get_selection()).await?;
        Ok(groups.into_iter().map(ModelObjects::from).collect())
    }

    async fn set_selection(&self, selector: &ObjectSelector) -> Result<()> {
        const METHOD: &str = "setSelection";
        let selector = selector_value(METHOD, selector)?;
        Self::settle(METHOD, self.host.set_selection(selector)).await?;
        Ok(())
    }

    async fn set_camera(&self, selector: &ObjectSelector) -> Result<()> {
        const METHOD: &str = "setCamera";
        let selector = selector_value(METHOD, selector)?;
        Self::settle(METHOD, self.host.set_camera(selector)).await?;
        Ok(())
    }

    async fn assembly_selection(&self) -> Result<bool> {
        let settings: JsSettings = Self::call_as("getSettings", self.host.get_settings()).await?;
        Ok(settings.assembly_selection)
    }

    async fn set_assembly_selection(&self, enabled: bool) -> Result<()> {
        const METHOD: &str = "setSettings";
        let settings = Self::encode(
            METHOD,
            &JsSettings {
                assembly_selection: enabled,
            },
        )?;
        Self::settle(METHOD, self.host.set_settings(settings)).await?;
        Ok(())
    }
}
