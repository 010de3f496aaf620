// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Whole-day and whole-month deletes behind two confirmations.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use site_progress_core::{confirm::REQUIRED_CONFIRMATIONS, BulkDeleteTarget, DateScope, RecordKind};
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::ConfirmOutcome;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub kind: RecordKind,
    /// `YYYY-MM-DD` for one day, `YYYY-MM` for one month.
    pub scope: String,
}

#[derive(Debug, Serialize)]
pub struct PendingDeleteResponse {
    pub token: Uuid,
    pub kind: RecordKind,
    pub scope: String,
    pub confirmations_required: u8,
    pub expires_in_secs: u64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ConfirmResponse {
    Armed { confirmations: u8 },
    Executed { deleted: u64 },
}

/// POST /api/v1/projects/:project/bulk-delete
pub async fn request(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<(StatusCode, Json<PendingDeleteResponse>), ApiError> {
    let scope = DateScope::parse(&body.scope)?;
    let token = state.pending.request(BulkDeleteTarget {
        project_id: project,
        kind: body.kind,
        scope,
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(PendingDeleteResponse {
            token,
            kind: body.kind,
            scope: scope.key(),
            confirmations_required: REQUIRED_CONFIRMATIONS,
            expires_in_secs: state.pending.ttl().as_secs(),
        }),
    ))
}

/// POST /api/v1/bulk-delete/:token/confirm
///
/// The first call arms the request, the second runs the delete.
pub async fn confirm(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    match state.pending.confirm(token)? {
        ConfirmOutcome::Waiting { confirmations } => Ok(Json(ConfirmResponse::Armed { confirmations })),
        ConfirmOutcome::Execute(target) => {
            let deleted = state.store.delete_in_scope(&target).await?;
            Ok(Json(ConfirmResponse::Executed { deleted }))
        }
    }
}

/// DELETE /api/v1/bulk-delete/:token
pub async fn cancel(State(state): State<AppState>, Path(token): Path<Uuid>) -> Result<StatusCode, ApiError> {
    if state.pending.cancel(token) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::ConfirmationNotFound(token.to_string()))
    }
}
