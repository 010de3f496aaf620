// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP routes.

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::AppState;

pub mod bulk_delete;
pub mod classification;
pub mod health;
pub mod locks;
pub mod records;
pub mod resources;

/// All API routes, without middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Root endpoint - API information
        .route("/", get(health::info))
        .route("/api/v1/health", get(health::check))
        .route("/api/v1/ready", get(health::ready))
        .route("/api/v1/engine-config", get(classification::engine_config))
        // Records
        .route(
            "/api/v1/projects/:project/installations",
            get(records::list_installations).post(records::create_installation),
        )
        .route(
            "/api/v1/installations/:id",
            patch(records::update_installation).delete(records::delete_installation),
        )
        .route(
            "/api/v1/projects/:project/preassemblies",
            get(records::list_preassemblies).post(records::create_preassembly),
        )
        .route(
            "/api/v1/preassemblies/:id",
            patch(records::update_preassembly).delete(records::delete_preassembly),
        )
        // Bulk deletes
        .route("/api/v1/projects/:project/bulk-delete", post(bulk_delete::request))
        .route("/api/v1/bulk-delete/:token/confirm", post(bulk_delete::confirm))
        .route("/api/v1/bulk-delete/:token", delete(bulk_delete::cancel))
        // Coloring
        .route(
            "/api/v1/projects/:project/classification",
            get(classification::classification),
        )
        // Locks and resources
        .route("/api/v1/projects/:project/locks", get(locks::list))
        .route(
            "/api/v1/projects/:project/locks/:day",
            put(locks::lock).delete(locks::unlock),
        )
        .route("/api/v1/projects/:project/resources", get(resources::list))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use site_progress_core::EngineConfig;
    use site_progress_store::{connect_lazy, RecordStore};
    use tower::ServiceExt;

    use super::*;
    use crate::services::PendingDeletes;

    /// State over a pool that never connects; only routes that stay off the
    /// database are exercised here.
    fn state() -> AppState {
        let pool = connect_lazy("postgres://localhost:1/site_progress_test", 1).unwrap();
        let engine = EngineConfig {
            batch_size: 1234,
            ..EngineConfig::default()
        };
        AppState {
            store: RecordStore::new(pool),
            pending: Arc::new(PendingDeletes::new(Duration::from_secs(60))),
            engine: Arc::new(engine),
        }
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_and_info() {
        let (status, body) = send(router(state()), "GET", "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "site-progress-server");

        let (status, body) = send(router(state()), "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["endpoints"].as_array().unwrap().len() > 10);
    }

    #[tokio::test]
    async fn engine_config_carries_batch_size() {
        let (status, body) = send(router(state()), "GET", "/api/v1/engine-config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["engine"]["batchSize"], 1234);
        assert_eq!(body["polling"]["selectionIntervalMs"], 1000);
    }

    #[tokio::test]
    async fn bulk_delete_needs_two_confirmations() {
        let app = router(state());
        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/v1/projects/p1/bulk-delete",
            Some(json!({ "kind": "installation", "scope": "2024-05" })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["scope"], "2024-05");
        assert_eq!(body["confirmations_required"], 2);

        let token = body["token"].as_str().unwrap().to_string();
        let (status, body) = send(
            app.clone(),
            "POST",
            &format!("/api/v1/bulk-delete/{token}/confirm"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stage"], "armed");
        assert_eq!(body["confirmations"], 1);

        let (status, _) = send(app, "DELETE", &format!("/api/v1/bulk-delete/{token}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn bulk_delete_rejects_bad_scope() {
        let (status, body) = send(
            router(state()),
            "POST",
            "/api/v1/projects/p1/bulk-delete",
            Some(json!({ "kind": "preassembly", "scope": "May 2024" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_DATE");
    }

    #[tokio::test]
    async fn unknown_confirmation_token() {
        let uri = format!("/api/v1/bulk-delete/{}/confirm", uuid::Uuid::new_v4());
        let (status, body) = send(router(state()), "POST", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "CONFIRMATION_NOT_FOUND");
    }

    #[tokio::test]
    async fn record_without_guid_is_rejected_before_the_database() {
        let (status, body) = send(
            router(state()),
            "POST",
            "/api/v1/projects/p1/installations",
            Some(json!({
                "guid": "  ",
                "at": "2024-05-02T10:15:00Z",
                "recorded_by": "site@example.com"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "MISSING_GUID");
    }

    #[tokio::test]
    async fn lock_rejects_malformed_day() {
        let (status, body) = send(
            router(state()),
            "PUT",
            "/api/v1/projects/p1/locks/2024-13-40",
            Some(json!({ "locked_by": "lead" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_DATE");
    }

    #[tokio::test]
    async fn unknown_mode_is_a_bad_request() {
        let (status, _) = send(
            router(state()),
            "GET",
            "/api/v1/projects/p1/classification?mode=rainbow",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
