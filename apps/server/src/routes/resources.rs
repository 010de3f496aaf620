// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use axum::{
    extract::{Path, State},
    Json,
};
use site_progress_store::Resource;

use crate::error::ApiError;
use crate::AppState;

/// GET /api/v1/projects/:project/resources
pub async fn list(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<Vec<Resource>>, ApiError> {
    Ok(Json(state.store.list_resources(&project).await?))
}
