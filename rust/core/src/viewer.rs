// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed interface to the host 3D viewer.
//!
//! The host SDK is loosely typed; every implementation of [`ViewerBridge`]
//! is expected to do its own shape checking and hand back these types only.

use crate::color::Rgb;
use crate::error::Result;

/// Viewer-session-local object handle. Invalid once its model is unloaded.
pub type RuntimeId = u32;

/// A loaded model.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelInfo {
    pub id: String,
    pub name: Option<String>,
}

/// Runtime ids grouped under one model.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelObjects {
    pub model_id: String,
    pub runtime_ids: Vec<RuntimeId>,
}

/// Which objects a viewer call applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectSelector {
    /// Every object of every loaded model.
    All,
    Objects(Vec<ModelObjects>),
}

impl ObjectSelector {
    pub fn single(model_id: &str, runtime_ids: Vec<RuntimeId>) -> Self {
        ObjectSelector::Objects(vec![ModelObjects {
            model_id: model_id.to_string(),
            runtime_ids,
        }])
    }

    pub fn object_count(&self) -> Option<usize> {
        match self {
            ObjectSelector::All => None,
            ObjectSelector::Objects(groups) => {
                Some(groups.iter().map(|g| g.runtime_ids.len()).sum())
            }
        }
    }
}

/// Color override for [`ViewerBridge::set_object_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorState {
    /// Restore the model's own colors.
    Reset,
    Color(Rgb),
}

/// The host viewer's selection, object-state and camera API.
///
/// All methods are asynchronous because the host resolves them through its
/// own message channel. Implementations are used from a single thread.
#[allow(async_fn_in_trait)]
pub trait ViewerBridge {
    /// Models currently loaded in the scene.
    async fn get_models(&self) -> Result<Vec<ModelInfo>>;

    /// Every runtime id of one model.
    async fn list_objects(&self, model_id: &str) -> Result<Vec<RuntimeId>>;

    /// Resolve external GUIDs in one model. The result is index-aligned with
    /// `guids`; `None` marks a GUID the model does not contain.
    async fn convert_to_runtime_ids(
        &self,
        model_id: &str,
        guids: &[String],
    ) -> Result<Vec<Option<RuntimeId>>>;

    /// Reverse of [`convert_to_runtime_ids`](Self::convert_to_runtime_ids), index-aligned.
    async fn convert_to_object_ids(
        &self,
        model_id: &str,
        runtime_ids: &[RuntimeId],
    ) -> Result<Vec<Option<String>>>;

    async fn set_object_state(&self, selector: &ObjectSelector, color: ColorState) -> Result<()>;

    async fn get_selection(&self) -> Result<Vec<ModelObjects>>;

    async fn set_selection(&self, selector: &ObjectSelector) -> Result<()>;

    /// Frame the given objects.
    async fn set_camera(&self, selector: &ObjectSelector) -> Result<()>;

    /// Whether clicking selects whole assemblies instead of parts.
    async fn assembly_selection(&self) -> Result<bool>;

    async fn set_assembly_selection(&self, enabled: bool) -> Result<()>;
}
