// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Site-Progress Store
//!
//! Typed access to the Postgres tables behind the progress tracker:
//! installations, preassemblies, day locks and project resources.
//!
//! All writes go through [`RecordStore`], which enforces day locks, one
//! record per object and kind, and the preassembly-before-installation rule.
//! Reads used for coloring can be wrapped in [`list_or_empty`] so a database
//! hiccup shows an uncolored scene instead of an error.

use std::future::Future;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use time::{Date, OffsetDateTime, UtcOffset};

mod error;
mod locks;
mod records;
mod resources;
mod rows;
mod rules;

pub use error::{Result, StoreError};
pub use locks::DayLock;
pub use resources::Resource;
pub use rows::{NewRecord, RecordPatch};
pub use sqlx::Error as DatabaseError;

/// Record store over a Postgres pool.
#[derive(Debug, Clone)]
pub struct RecordStore {
    pool: PgPool,
    /// Site offset used to map timestamps to calendar days.
    utc_offset: UtcOffset,
}

impl RecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            utc_offset: UtcOffset::UTC,
        }
    }

    pub fn with_utc_offset(mut self, offset: UtcOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn utc_offset(&self) -> UtcOffset {
        self.utc_offset
    }

    /// Calendar day of a timestamp at the site.
    pub fn day_of(&self, ts: OffsetDateTime) -> Date {
        ts.to_offset(self.utc_offset).date()
    }

    /// Apply the bundled migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running PostgreSQL migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Migrations completed successfully");
        Ok(())
    }

    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

/// Pool that connects on first use, so a service can start without the
/// database being reachable.
pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy(database_url)?;
    Ok(pool)
}

/// Await a read and degrade to an empty list on failure.
pub async fn list_or_empty<T, F>(what: &str, read: F) -> Vec<T>
where
    F: Future<Output = Result<Vec<T>>>,
{
    match read.await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(what = what, error = %e, "Read failed, continuing with no data");
            Vec::new()
        }
    }
}
