// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Write rules that need no database round trip: which days a write
//! touches, and which existing rows refuse it.

use site_progress_core::dates::format_day;
use site_progress_core::{validate_order, RecordKind};
use time::{Date, OffsetDateTime, UtcOffset};

use crate::error::{Result, StoreError};
use crate::rows::RecordRow;

/// Days that must be unlocked for a write: the day a record is stored on
/// and, for date edits, the day it moves to.
pub(crate) fn touched_days(
    offset: UtcOffset,
    stored: Option<OffsetDateTime>,
    requested: Option<OffsetDateTime>,
) -> Vec<Date> {
    let mut days: Vec<Date> = [stored, requested]
        .into_iter()
        .flatten()
        .map(|ts| ts.to_offset(offset).date())
        .collect();
    days.sort();
    days.dedup();
    days
}

/// Refuse when any of `locked` is set, naming the earliest day.
pub(crate) fn refuse_locked(locked: &[Date]) -> Result<()> {
    match locked.iter().min() {
        Some(day) => Err(StoreError::DayLocked { day: format_day(*day) }),
        None => Ok(()),
    }
}

/// Refuse a new record when the object already has one of the same kind.
pub(crate) fn refuse_duplicate(kind: RecordKind, existing: &[RecordRow]) -> Result<()> {
    match existing.first() {
        Some(row) => Err(StoreError::AlreadyRecorded {
            kind,
            guid: row.display_guid().to_string(),
        }),
        None => Ok(()),
    }
}

/// Check a record of `kind` dated `at` against the object's records of the
/// other kind. Preassembly must stay strictly before installation from
/// either side.
pub(crate) fn check_order(kind: RecordKind, at: OffsetDateTime, counterparts: &[RecordRow]) -> Result<()> {
    for row in counterparts {
        match kind {
            RecordKind::Preassembly => validate_order(at, row.recorded_at)?,
            RecordKind::Installation => validate_order(row.recorded_at, at)?,
        }
    }
    Ok(())
}

/// A unique index caught a duplicate that slipped past the lookup.
pub(crate) fn unique_violation(kind: RecordKind, guid: &str, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyRecorded {
            kind,
            guid: guid.to_string(),
        },
        _ => StoreError::Database(err),
    }
}
