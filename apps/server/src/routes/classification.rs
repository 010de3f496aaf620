// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server-computed classification and engine defaults.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use site_progress_core::{EngineConfig, PollingConfig, RecordKind};
use site_progress_store::list_or_empty;

use crate::services::classification::{classify, ClassificationResponse, Mode};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ClassificationQuery {
    #[serde(default)]
    pub mode: Mode,
    /// Records bucketed by the day and month modes.
    #[serde(default = "default_kind")]
    pub kind: RecordKind,
}

fn default_kind() -> RecordKind {
    RecordKind::Installation
}

/// GET /api/v1/projects/:project/classification?mode=status|installed|preassembly|day|month
///
/// Read failures degrade to an empty record set, so the panel shows an
/// uncolored scene rather than an error.
pub async fn classification(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Query(query): Query<ClassificationQuery>,
) -> Json<ClassificationResponse> {
    let installed = if query.mode.needs_installations(query.kind) {
        list_or_empty("installations", state.store.list_installations(&project)).await
    } else {
        Vec::new()
    };
    let preassembled = if query.mode.needs_preassemblies(query.kind) {
        list_or_empty("preassemblies", state.store.list_preassemblies(&project)).await
    } else {
        Vec::new()
    };

    let response = classify(
        query.mode,
        query.kind,
        &installed,
        &preassembled,
        state.store.utc_offset(),
        &state.engine.palette,
    );
    tracing::debug!(
        project_id = %project,
        mode = ?query.mode,
        objects = response.objects.len(),
        "Classification computed"
    );
    Json(response)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfigResponse {
    pub engine: EngineConfig,
    pub polling: PollingConfig,
    pub utc_offset_minutes: i32,
}

/// GET /api/v1/engine-config - options for the panel's `ProgressSession`.
pub async fn engine_config(State(state): State<AppState>) -> Json<EngineConfigResponse> {
    Json(EngineConfigResponse {
        engine: state.engine.as_ref().clone(),
        polling: PollingConfig::default(),
        utc_offset_minutes: i32::from(state.store.utc_offset().whole_minutes()),
    })
}
