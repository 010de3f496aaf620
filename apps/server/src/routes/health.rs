// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Health check and API information endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
}

/// Readiness response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub database: bool,
}

/// API information response.
#[derive(Debug, Serialize)]
pub struct ApiInfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

/// Endpoint information.
#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

const SERVICE: &str = "site-progress-server";

/// GET /api/v1/health - Liveness, no database round-trip.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: SERVICE,
    })
}

/// GET /api/v1/ready - 503 until the database answers.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let database = state.store.is_healthy().await;
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadyResponse {
            status: if database { "ready" } else { "unavailable" },
            database,
        }),
    )
}

fn endpoint(method: &'static str, path: &'static str, description: &'static str) -> EndpointInfo {
    EndpointInfo {
        method,
        path,
        description,
    }
}

/// GET / - API information endpoint.
pub async fn info() -> Json<ApiInfoResponse> {
    Json(ApiInfoResponse {
        service: SERVICE,
        version: env!("CARGO_PKG_VERSION"),
        description: "Installation and preassembly records for 3D progress coloring",
        endpoints: vec![
            endpoint("GET", "/api/v1/health", "Health check endpoint"),
            endpoint("GET", "/api/v1/ready", "Database readiness"),
            endpoint("GET", "/api/v1/engine-config", "Coloring engine defaults for the panel"),
            endpoint("GET", "/api/v1/projects/:project/installations", "List installations"),
            endpoint("POST", "/api/v1/projects/:project/installations", "Record an installation"),
            endpoint("PATCH", "/api/v1/installations/:id", "Edit an installation"),
            endpoint("DELETE", "/api/v1/installations/:id", "Delete an installation"),
            endpoint("GET", "/api/v1/projects/:project/preassemblies", "List preassemblies"),
            endpoint("POST", "/api/v1/projects/:project/preassemblies", "Record a preassembly"),
            endpoint("PATCH", "/api/v1/preassemblies/:id", "Edit a preassembly"),
            endpoint("DELETE", "/api/v1/preassemblies/:id", "Delete a preassembly"),
            endpoint("POST", "/api/v1/projects/:project/bulk-delete", "Request a day or month delete"),
            endpoint("POST", "/api/v1/bulk-delete/:token/confirm", "Confirm a bulk delete (twice)"),
            endpoint("DELETE", "/api/v1/bulk-delete/:token", "Withdraw a bulk delete"),
            endpoint("GET", "/api/v1/projects/:project/classification", "Per-object colors by mode"),
            endpoint("GET", "/api/v1/projects/:project/locks", "List locked days"),
            endpoint("PUT", "/api/v1/projects/:project/locks/:day", "Lock a day"),
            endpoint("DELETE", "/api/v1/projects/:project/locks/:day", "Unlock a day"),
            endpoint("GET", "/api/v1/projects/:project/resources", "Active resources"),
        ],
    })
}
