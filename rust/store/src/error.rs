// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the record store.

use site_progress_core::RecordKind;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{kind} record {id} not found")]
    NotFound { kind: RecordKind, id: Uuid },

    /// Writes to records dated on a locked day are refused.
    #[error("Day {day} is locked")]
    DayLocked { day: String },

    #[error("Object {guid} already has a {kind} record")]
    AlreadyRecorded { kind: RecordKind, guid: String },

    /// Validation failures from the core rules (GUIDs, preassembly order).
    #[error(transparent)]
    Invalid(#[from] site_progress_core::Error),
}

impl StoreError {
    /// Whether the caller sent something the store refuses, as opposed to an
    /// infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, StoreError::Database(_) | StoreError::Migration(_))
    }
}
