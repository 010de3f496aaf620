// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Site-Progress Server - records and classification for the progress panel.
//!
//! This server provides a REST API over the record store. It supports:
//!
//! - Installation and preassembly CRUD with day locks
//! - Whole-day and whole-month deletes behind two confirmations
//! - Per-object classification computed from stored records
//!
//! # Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `GET|POST /api/v1/projects/:project/installations` - List or record installations
//! - `GET|POST /api/v1/projects/:project/preassemblies` - List or record preassemblies
//! - `POST /api/v1/projects/:project/bulk-delete` - Request a bulk delete
//! - `POST /api/v1/bulk-delete/:token/confirm` - Confirm a bulk delete
//! - `GET /api/v1/projects/:project/classification` - Per-object colors
//! - `GET /api/v1/projects/:project/locks` - Locked days
//!
//! `GET /` lists every route.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use site_progress_core::EngineConfig;
use site_progress_store::{connect_lazy, RecordStore};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

mod config;
mod error;
mod routes;
mod services;

use config::Config;
use services::PendingDeletes;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    pub pending: Arc<PendingDeletes>,
    pub engine: Arc<EngineConfig>,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tower_http=debug,site_progress_server=debug".into()),
        )
        .pretty()
        .init();

    let config = Config::from_env();

    tracing::info!(
        port = config.port,
        db_max_connections = config.db_max_connections,
        color_batch_size = config.color_batch_size,
        confirmation_ttl_secs = config.confirmation_ttl_secs,
        site_utc_offset_minutes = config.site_utc_offset_minutes,
        "Starting Site-Progress Server"
    );

    let pool = connect_lazy(&config.database_url, config.db_max_connections)?;
    let store = RecordStore::new(pool).with_utc_offset(config.site_utc_offset());

    if config.run_migrations {
        // Start anyway; requests report the database error until it is reachable
        if let Err(e) = store.migrate().await {
            tracing::error!(error = %e, "Migrations failed");
        }
    }

    let engine = EngineConfig {
        batch_size: config.color_batch_size,
        ..EngineConfig::default()
    };

    let state = AppState {
        store,
        pending: Arc::new(PendingDeletes::new(Duration::from_secs(config.confirmation_ttl_secs))),
        engine: Arc::new(engine),
    };

    let app = routes::router(state)
        // Middleware
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
