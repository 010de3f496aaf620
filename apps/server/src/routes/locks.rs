// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Day lock endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use site_progress_core::dates::parse_day_key;
use site_progress_store::DayLock;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LockRequest {
    pub locked_by: String,
}

/// GET /api/v1/projects/:project/locks
pub async fn list(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<Vec<DayLock>>, ApiError> {
    Ok(Json(state.store.list_locks(&project).await?))
}

/// PUT /api/v1/projects/:project/locks/:day
///
/// 201 when the lock is new, 200 when the day was already locked.
pub async fn lock(
    State(state): State<AppState>,
    Path((project, day)): Path<(String, String)>,
    Json(body): Json<LockRequest>,
) -> Result<StatusCode, ApiError> {
    let day = parse_day_key(&day)?;
    let created = state.store.lock_day(&project, day, &body.locked_by).await?;
    Ok(if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    })
}

/// DELETE /api/v1/projects/:project/locks/:day
pub async fn unlock(
    State(state): State<AppState>,
    Path((project, day)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let day = parse_day_key(&day)?;
    if state.store.unlock_day(&project, day).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}
