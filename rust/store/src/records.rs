// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Installation and preassembly CRUD.

use site_progress_core::{BulkDeleteTarget, InstalledRecord, PreassemblyRecord, RecordKind};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::rows::{select_columns, timestamp_column, NewRecord, RecordPatch, RecordRow};
use crate::rules::{check_order, refuse_duplicate, refuse_locked, touched_days, unique_violation};
use crate::RecordStore;

impl RecordStore {
    pub async fn list_installations(&self, project_id: &str) -> Result<Vec<InstalledRecord>> {
        let rows = self.list_rows(RecordKind::Installation, project_id).await?;
        Ok(rows.into_iter().map(InstalledRecord::from).collect())
    }

    pub async fn list_preassemblies(&self, project_id: &str) -> Result<Vec<PreassemblyRecord>> {
        let rows = self.list_rows(RecordKind::Preassembly, project_id).await?;
        Ok(rows.into_iter().map(PreassemblyRecord::from).collect())
    }

    async fn list_rows(&self, kind: RecordKind, project_id: &str) -> Result<Vec<RecordRow>> {
        let query = format!(
            "SELECT {} FROM {} WHERE project_id = $1 ORDER BY {}, id",
            select_columns(kind),
            kind.table(),
            timestamp_column(kind)
        );
        let rows = sqlx::query_as::<_, RecordRow>(&query)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn fetch_row(conn: &mut PgConnection, kind: RecordKind, id: Uuid) -> Result<RecordRow> {
        let query = format!(
            "SELECT {} FROM {} WHERE id = $1",
            select_columns(kind),
            kind.table()
        );
        sqlx::query_as::<_, RecordRow>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(StoreError::NotFound { kind, id })
    }

    /// Rows of `kind` in the project matching any of the lower-cased GUIDs.
    async fn rows_matching(
        conn: &mut PgConnection,
        kind: RecordKind,
        project_id: &str,
        keys: &[String],
    ) -> Result<Vec<RecordRow>> {
        let query = format!(
            "SELECT {} FROM {} WHERE project_id = $1 \
             AND (lower(guid) = ANY($2) OR lower(guid_ifc) = ANY($2) OR lower(guid_ms) = ANY($2)) \
             ORDER BY {}",
            select_columns(kind),
            kind.table(),
            timestamp_column(kind)
        );
        let rows = sqlx::query_as::<_, RecordRow>(&query)
            .bind(project_id)
            .bind(keys)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    /// Serialize record writes of one project until the transaction ends,
    /// so the duplicate and ordering checks see each other's inserts.
    async fn lock_project(conn: &mut PgConnection, project_id: &str) -> Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("records:{project_id}"))
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Insert a record. Refuses locked days, objects that already have a
    /// record of the same kind, and dates that would put a preassembly at or
    /// after the object's installation.
    pub async fn create(&self, kind: RecordKind, project_id: &str, record: NewRecord) -> Result<Uuid> {
        let record = record.normalized()?;
        let keys = record.guid_keys();
        let mut tx = self.pool.begin().await?;
        Self::lock_project(&mut tx, project_id).await?;

        let days = touched_days(self.utc_offset, None, Some(record.at));
        Self::ensure_unlocked(&mut tx, project_id, &days).await?;

        let existing = Self::rows_matching(&mut tx, kind, project_id, &keys).await?;
        refuse_duplicate(kind, &existing)?;

        let counterparts = Self::rows_matching(&mut tx, kind.counterpart(), project_id, &keys).await?;
        check_order(kind, record.at, &counterparts)?;

        let id = Uuid::new_v4();
        let query = format!(
            "INSERT INTO {} (id, project_id, guid, guid_ifc, guid_ms, assembly_mark, product_name, \
             {}, recorded_by, team, method, notes, photo_urls) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            kind.table(),
            timestamp_column(kind)
        );
        sqlx::query(&query)
            .bind(id)
            .bind(project_id)
            .bind(&record.guid)
            .bind(&record.guid_ifc)
            .bind(&record.guid_ms)
            .bind(&record.assembly_mark)
            .bind(&record.product_name)
            .bind(record.at)
            .bind(&record.recorded_by)
            .bind(&record.team)
            .bind(&record.method)
            .bind(&record.notes)
            .bind(&record.photo_urls)
            .execute(&mut *tx)
            .await
            .map_err(|e| unique_violation(kind, record.display_guid(), e))?;
        tx.commit().await?;

        tracing::info!(
            kind = %kind,
            id = %id,
            project_id = project_id,
            guid_keys = keys.len(),
            "Record created"
        );
        Ok(id)
    }

    /// Change date, notes, method or team of a record. A new date must be on
    /// an unlocked day and keep preassembly before installation.
    pub async fn update(&self, kind: RecordKind, id: Uuid, patch: RecordPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        let row = Self::fetch_row(&mut tx, kind, id).await?;
        if patch.at.is_some() {
            Self::lock_project(&mut tx, &row.project_id).await?;
        }

        let days = touched_days(self.utc_offset, Some(row.recorded_at), patch.at);
        Self::ensure_unlocked(&mut tx, &row.project_id, &days).await?;

        if let Some(at) = patch.at {
            let keys = row.guid_keys();
            let counterparts =
                Self::rows_matching(&mut tx, kind.counterpart(), &row.project_id, &keys).await?;
            check_order(kind, at, &counterparts)?;
        }

        let query = format!(
            "UPDATE {table} SET {ts} = COALESCE($2, {ts}), notes = COALESCE($3, notes), \
             method = COALESCE($4, method), team = COALESCE($5, team) WHERE id = $1",
            table = kind.table(),
            ts = timestamp_column(kind)
        );
        sqlx::query(&query)
            .bind(id)
            .bind(patch.at)
            .bind(&patch.notes)
            .bind(&patch.method)
            .bind(&patch.team)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(kind = %kind, id = %id, "Record updated");
        Ok(())
    }

    pub async fn delete(&self, kind: RecordKind, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let row = Self::fetch_row(&mut tx, kind, id).await?;
        let days = touched_days(self.utc_offset, Some(row.recorded_at), None);
        Self::ensure_unlocked(&mut tx, &row.project_id, &days).await?;

        let query = format!("DELETE FROM {} WHERE id = $1", kind.table());
        sqlx::query(&query).bind(id).execute(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!(kind = %kind, id = %id, "Record deleted");
        Ok(())
    }

    /// Delete every record of one kind dated inside a day or month. Refused
    /// as a whole when any day in the scope is locked.
    pub async fn delete_in_scope(&self, target: &BulkDeleteTarget) -> Result<u64> {
        let (start, end) = target.scope.bounds(self.utc_offset)?;
        let mut tx = self.pool.begin().await?;

        let locked = Self::locked_days_between(&mut tx, &target.project_id, start.date(), end.date()).await?;
        refuse_locked(&locked)?;

        let query = format!(
            "DELETE FROM {table} WHERE project_id = $1 AND {ts} >= $2 AND {ts} < $3",
            table = target.kind.table(),
            ts = timestamp_column(target.kind)
        );
        let deleted = sqlx::query(&query)
            .bind(&target.project_id)
            .bind(start)
            .bind(end)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        tracing::warn!(
            kind = %target.kind,
            project_id = %target.project_id,
            scope = %target.scope.key(),
            deleted = deleted,
            "Bulk delete executed"
        );
        Ok(deleted)
    }
}
