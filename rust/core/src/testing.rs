// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory viewer for tests.
//!
//! Records every call so tests can assert on the exact traffic a coloring
//! pass produces.

use std::cell::{Cell, RefCell};

use rustc_hash::FxHashSet;

use crate::color::Rgb;
use crate::error::{Error, Result};
use crate::viewer::{ColorState, ModelInfo, ModelObjects, ObjectSelector, RuntimeId, ViewerBridge};

/// A call received by [`MockViewer`].
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerCall {
    GetModels,
    ListObjects(String),
    ConvertToRuntimeIds { model_id: String, count: usize },
    ConvertToObjectIds { model_id: String, count: usize },
    SetObjectState { selector: ObjectSelector, color: ColorState },
    GetSelection,
    SetSelection(ObjectSelector),
    SetCamera(ObjectSelector),
    SetAssemblySelection(bool),
}

#[derive(Debug, Clone)]
struct MockModel {
    id: String,
    /// Index + 1 is the runtime id.
    guids: Vec<String>,
}

/// Scriptable [`ViewerBridge`] backed by plain vectors.
#[derive(Debug, Default)]
pub struct MockViewer {
    models: RefCell<Vec<MockModel>>,
    calls: RefCell<Vec<ViewerCall>>,
    selection: RefCell<Vec<ModelObjects>>,
    assembly_selection: Cell<bool>,
    failing_models: RefCell<FxHashSet<String>>,
    failing_colors: RefCell<FxHashSet<Rgb>>,
    fail_reset: Cell<bool>,
}

impl MockViewer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model whose objects get runtime ids `1..=guids.len()`.
    pub fn with_model(self, id: &str, guids: &[&str]) -> Self {
        self.add_model(id, guids);
        self
    }

    pub fn add_model(&self, id: &str, guids: &[&str]) {
        self.models.borrow_mut().push(MockModel {
            id: id.to_string(),
            guids: guids.iter().map(|g| g.to_string()).collect(),
        });
    }

    pub fn remove_model(&self, id: &str) {
        self.models.borrow_mut().retain(|m| m.id != id);
    }

    /// Make every call that names this model fail.
    pub fn fail_model(&self, id: &str) {
        self.failing_models.borrow_mut().insert(id.to_string());
    }

    /// Make `set_object_state` fail for this color.
    pub fn fail_color(&self, color: Rgb) {
        self.failing_colors.borrow_mut().insert(color);
    }

    pub fn fail_reset(&self, fail: bool) {
        self.fail_reset.set(fail);
    }

    pub fn select(&self, model_id: &str, runtime_ids: &[RuntimeId]) {
        *self.selection.borrow_mut() = vec![ModelObjects {
            model_id: model_id.to_string(),
            runtime_ids: runtime_ids.to_vec(),
        }];
    }

    pub fn clear_selection(&self) {
        self.selection.borrow_mut().clear();
    }

    pub fn set_assembly_mode(&self, enabled: bool) {
        self.assembly_selection.set(enabled);
    }

    pub fn assembly_mode(&self) -> bool {
        self.assembly_selection.get()
    }

    pub fn calls(&self) -> Vec<ViewerCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Only the `set_object_state` calls, in order.
    pub fn color_calls(&self) -> Vec<(ObjectSelector, ColorState)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                ViewerCall::SetObjectState { selector, color } => Some((selector.clone(), *color)),
                _ => None,
            })
            .collect()
    }

    /// Number of objects that received a specific color (resets excluded).
    pub fn colored_object_count(&self) -> usize {
        self.color_calls()
            .iter()
            .filter(|(_, color)| matches!(color, ColorState::Color(_)))
            .filter_map(|(selector, _)| selector.object_count())
            .sum()
    }

    fn record(&self, call: ViewerCall) {
        self.calls.borrow_mut().push(call);
    }

    fn check_model(&self, model_id: &str) -> Result<()> {
        if self.failing_models.borrow().contains(model_id) {
            return Err(Error::Viewer(format!("model {model_id} unavailable")));
        }
        Ok(())
    }

    fn model(&self, model_id: &str) -> Result<MockModel> {
        self.check_model(model_id)?;
        self.models
            .borrow()
            .iter()
            .find(|m| m.id == model_id)
            .cloned()
            .ok_or_else(|| Error::Viewer(format!("model {model_id} not loaded")))
    }
}

impl ViewerBridge for MockViewer {
    async fn get_models(&self) -> Result<Vec<ModelInfo>> {
        self.record(ViewerCall::GetModels);
        Ok(self
            .models
            .borrow()
            .iter()
            .map(|m| ModelInfo {
                id: m.id.clone(),
                name: None,
            })
            .collect())
    }

    async fn list_objects(&self, model_id: &str) -> Result<Vec<RuntimeId>> {
        self.record(ViewerCall::ListObjects(model_id.to_string()));
        let model = self.model(model_id)?;
        Ok((1..=model.guids.len() as RuntimeId).collect())
    }

    async fn convert_to_runtime_ids(
        &self,
        model_id: &str,
        guids: &[String],
    ) -> Result<Vec<Option<RuntimeId>>> {
        self.record(ViewerCall::ConvertToRuntimeIds {
            model_id: model_id.to_string(),
            count: guids.len(),
        });
        let model = self.model(model_id)?;
        Ok(guids
            .iter()
            .map(|g| {
                model
                    .guids
                    .iter()
                    .position(|candidate| candidate.eq_ignore_ascii_case(g))
                    .map(|i| i as RuntimeId + 1)
            })
            .collect())
    }

    async fn convert_to_object_ids(
        &self,
        model_id: &str,
        runtime_ids: &[RuntimeId],
    ) -> Result<Vec<Option<String>>> {
        self.record(ViewerCall::ConvertToObjectIds {
            model_id: model_id.to_string(),
            count: runtime_ids.len(),
        });
        let model = self.model(model_id)?;
        Ok(runtime_ids
            .iter()
            .map(|id| {
                (*id as usize)
                    .checked_sub(1)
                    .and_then(|i| model.guids.get(i).cloned())
            })
            .collect())
    }

    async fn set_object_state(&self, selector: &ObjectSelector, color: ColorState) -> Result<()> {
        self.record(ViewerCall::SetObjectState {
            selector: selector.clone(),
            color,
        });
        match color {
            ColorState::Reset if self.fail_reset.get() => {
                Err(Error::Viewer("reset rejected".to_string()))
            }
            ColorState::Color(rgb) if self.failing_colors.borrow().contains(&rgb) => {
                Err(Error::Viewer(format!("color {rgb} rejected")))
            }
            _ => Ok(()),
        }
    }

    async fn get_selection(&self) -> Result<Vec<ModelObjects>> {
        self.record(ViewerCall::GetSelection);
        Ok(self.selection.borrow().clone())
    }

    async fn set_selection(&self, selector: &ObjectSelector) -> Result<()> {
        self.record(ViewerCall::SetSelection(selector.clone()));
        if let ObjectSelector::Objects(groups) = selector {
            *self.selection.borrow_mut() = groups.clone();
        }
        Ok(())
    }

    async fn set_camera(&self, selector: &ObjectSelector) -> Result<()> {
        self.record(ViewerCall::SetCamera(selector.clone()));
        Ok(())
    }

    async fn assembly_selection(&self) -> Result<bool> {
        Ok(self.assembly_selection.get())
    }

    async fn set_assembly_selection(&self, enabled: bool) -> Result<()> {
        self.record(ViewerCall::SetAssemblySelection(enabled));
        self.assembly_selection.set(enabled);
        Ok(())
    }
}
