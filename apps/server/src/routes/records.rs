// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Installation and preassembly endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use site_progress_core::{InstalledRecord, PreassemblyRecord, RecordKind};
use site_progress_store::{NewRecord, RecordPatch};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

/// GET /api/v1/projects/:project/installations
pub async fn list_installations(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<Vec<InstalledRecord>>, ApiError> {
    Ok(Json(state.store.list_installations(&project).await?))
}

/// GET /api/v1/projects/:project/preassemblies
pub async fn list_preassemblies(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<Vec<PreassemblyRecord>>, ApiError> {
    Ok(Json(state.store.list_preassemblies(&project).await?))
}

async fn create(
    state: &AppState,
    kind: RecordKind,
    project: &str,
    record: NewRecord,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state.store.create(kind, project, record).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// POST /api/v1/projects/:project/installations
pub async fn create_installation(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Json(record): Json<NewRecord>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    create(&state, RecordKind::Installation, &project, record).await
}

/// POST /api/v1/projects/:project/preassemblies
pub async fn create_preassembly(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Json(record): Json<NewRecord>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    create(&state, RecordKind::Preassembly, &project, record).await
}

/// PATCH /api/v1/installations/:id
pub async fn update_installation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<RecordPatch>,
) -> Result<StatusCode, ApiError> {
    state.store.update(RecordKind::Installation, id, patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/preassemblies/:id
pub async fn update_preassembly(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<RecordPatch>,
) -> Result<StatusCode, ApiError> {
    state.store.update(RecordKind::Preassembly, id, patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/installations/:id
pub async fn delete_installation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(RecordKind::Installation, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/preassemblies/:id
pub async fn delete_preassembly(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(RecordKind::Preassembly, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
