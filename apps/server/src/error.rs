// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types and handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use site_progress_core::Error as CoreError;
use site_progress_store::StoreError;
use thiserror::Error;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("Unknown or expired confirmation token {0}")]
    ConfirmationNotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

fn core_status(err: &CoreError) -> (StatusCode, &'static str) {
    match err {
        CoreError::PreassemblyNotBeforeInstallation { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "PREASSEMBLY_AFTER_INSTALLATION")
        }
        CoreError::MissingGuid => (StatusCode::BAD_REQUEST, "MISSING_GUID"),
        CoreError::InvalidGuid { .. } => (StatusCode::BAD_REQUEST, "INVALID_GUID"),
        CoreError::InvalidDateKey(_) => (StatusCode::BAD_REQUEST, "INVALID_DATE"),
        CoreError::NotConfirmed { .. } => (StatusCode::CONFLICT, "NOT_CONFIRMED"),
        CoreError::AlreadyExecuted => (StatusCode::CONFLICT, "ALREADY_EXECUTED"),
        CoreError::Viewer(_) | CoreError::EmptyPlayback | CoreError::PlaybackOutOfRange { .. } => {
            (StatusCode::BAD_REQUEST, "INVALID_REQUEST")
        }
    }
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Store(err) => match err {
                StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                StoreError::DayLocked { .. } => (StatusCode::LOCKED, "DAY_LOCKED"),
                StoreError::AlreadyRecorded { .. } => (StatusCode::CONFLICT, "ALREADY_RECORDED"),
                StoreError::Invalid(core) => core_status(core),
                StoreError::Database(_) => (StatusCode::SERVICE_UNAVAILABLE, "DATABASE_ERROR"),
                StoreError::Migration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "MIGRATION_ERROR"),
            },
            ApiError::Invalid(core) => core_status(core),
            ApiError::ConfirmationNotFound(_) => (StatusCode::NOT_FOUND, "CONFIRMATION_NOT_FOUND"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = code, "Request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_progress_core::RecordKind;

    #[test]
    fn rejections_map_to_client_errors() {
        let locked = ApiError::from(StoreError::DayLocked { day: "2024-05-02".into() });
        assert_eq!(locked.status(), (StatusCode::LOCKED, "DAY_LOCKED"));

        let duplicate = ApiError::from(StoreError::AlreadyRecorded {
            kind: RecordKind::Installation,
            guid: "1L3eG0ufj1rASMH6PLH000".into(),
        });
        assert_eq!(duplicate.status().0, StatusCode::CONFLICT);

        let order = ApiError::from(StoreError::Invalid(CoreError::PreassemblyNotBeforeInstallation {
            preassembled_at: "2024-05-03T00:00:00Z".into(),
            installed_at: "2024-05-02T00:00:00Z".into(),
        }));
        assert_eq!(order.status().0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn database_failures_are_unavailable() {
        let err = ApiError::from(StoreError::Database(sqlx_timeout()));
        assert_eq!(err.status(), (StatusCode::SERVICE_UNAVAILABLE, "DATABASE_ERROR"));
    }

    fn sqlx_timeout() -> site_progress_store::DatabaseError {
        site_progress_store::DatabaseError::PoolTimedOut
    }
}
