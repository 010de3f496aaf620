// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Day locks: a locked day freezes every record dated on it.

use serde::Serialize;
use site_progress_core::dates::format_day;
use sqlx::PgConnection;
use time::{Date, OffsetDateTime};

use crate::error::{Result, StoreError};
use crate::rules::refuse_locked;
use crate::RecordStore;

time::serde::format_description!(day_format, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DayLock {
    pub project_id: String,
    #[serde(with = "day_format")]
    pub day: Date,
    pub locked_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub locked_at: OffsetDateTime,
}

impl RecordStore {
    pub async fn list_locks(&self, project_id: &str) -> Result<Vec<DayLock>> {
        let locks = sqlx::query_as::<_, DayLock>(
            r#"
            SELECT project_id, day, locked_by, locked_at
            FROM day_locks
            WHERE project_id = $1
            ORDER BY day
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(locks)
    }

    /// Lock a day. Locking an already locked day keeps the original lock.
    pub async fn lock_day(&self, project_id: &str, day: Date, locked_by: &str) -> Result<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO day_locks (project_id, day, locked_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (project_id, day) DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(day)
        .bind(locked_by)
        .execute(&self.pool)
        .await?
        .rows_affected();

        tracing::info!(project_id = project_id, day = %format_day(day), locked_by = locked_by, "Day locked");
        Ok(inserted > 0)
    }

    /// Returns whether a lock existed.
    pub async fn unlock_day(&self, project_id: &str, day: Date) -> Result<bool> {
        let removed = sqlx::query("DELETE FROM day_locks WHERE project_id = $1 AND day = $2")
            .bind(project_id)
            .bind(day)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(project_id = project_id, day = %format_day(day), "Day unlocked");
        Ok(removed > 0)
    }

    pub async fn is_locked(&self, project_id: &str, day: Date) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        match Self::ensure_unlocked(&mut conn, project_id, &[day]).await {
            Ok(()) => Ok(false),
            Err(StoreError::DayLocked { .. }) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Refuse when any of `days` is locked for the project.
    pub(crate) async fn ensure_unlocked(conn: &mut PgConnection, project_id: &str, days: &[Date]) -> Result<()> {
        if days.is_empty() {
            return Ok(());
        }
        let locked: Vec<Date> = sqlx::query_scalar(
            "SELECT day FROM day_locks WHERE project_id = $1 AND day = ANY($2)",
        )
        .bind(project_id)
        .bind(days)
        .fetch_all(&mut *conn)
        .await?;
        refuse_locked(&locked)
    }

    /// Locked days in `[from, until)`.
    pub(crate) async fn locked_days_between(
        conn: &mut PgConnection,
        project_id: &str,
        from: Date,
        until: Date,
    ) -> Result<Vec<Date>> {
        let days = sqlx::query_scalar(
            "SELECT day FROM day_locks WHERE project_id = $1 AND day >= $2 AND day < $3 ORDER BY day",
        )
        .bind(project_id)
        .bind(from)
        .bind(until)
        .fetch_all(&mut *conn)
        .await?;
        Ok(days)
    }
}
