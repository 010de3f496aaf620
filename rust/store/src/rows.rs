// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Row types and input payloads for the two record tables.

use serde::{Deserialize, Serialize};
use site_progress_core::{
    normalize_guid, Error as CoreError, GuidKey, InstalledRecord, PreassemblyRecord, RecordKind,
};
use time::OffsetDateTime;
use uuid::Uuid;

/// Both record tables share their columns except for the timestamp name,
/// which is selected as `recorded_at`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordRow {
    pub id: Uuid,
    pub project_id: String,
    pub guid: Option<String>,
    pub guid_ifc: Option<String>,
    pub guid_ms: Option<String>,
    pub assembly_mark: Option<String>,
    pub product_name: Option<String>,
    pub recorded_at: OffsetDateTime,
    pub recorded_by: String,
    pub team: Option<String>,
    pub method: Option<String>,
    pub notes: Option<String>,
    pub photo_urls: Vec<String>,
}

impl From<RecordRow> for InstalledRecord {
    fn from(row: RecordRow) -> Self {
        InstalledRecord {
            id: row.id,
            project_id: row.project_id,
            guid: row.guid,
            guid_ifc: row.guid_ifc,
            guid_ms: row.guid_ms,
            assembly_mark: row.assembly_mark,
            product_name: row.product_name,
            installed_at: row.recorded_at,
            recorded_by: row.recorded_by,
            team: row.team,
            method: row.method,
            notes: row.notes,
            photo_urls: row.photo_urls,
        }
    }
}

impl From<RecordRow> for PreassemblyRecord {
    fn from(row: RecordRow) -> Self {
        PreassemblyRecord {
            id: row.id,
            project_id: row.project_id,
            guid: row.guid,
            guid_ifc: row.guid_ifc,
            guid_ms: row.guid_ms,
            assembly_mark: row.assembly_mark,
            product_name: row.product_name,
            preassembled_at: row.recorded_at,
            recorded_by: row.recorded_by,
            team: row.team,
            method: row.method,
            notes: row.notes,
            photo_urls: row.photo_urls,
        }
    }
}

impl RecordRow {
    pub fn guid_keys(&self) -> Vec<String> {
        guid_keys([&self.guid, &self.guid_ifc, &self.guid_ms])
    }

    /// The GUID to name the object by, IFC column first.
    pub fn display_guid(&self) -> &str {
        self.guid_ifc
            .as_deref()
            .or(self.guid.as_deref())
            .or(self.guid_ms.as_deref())
            .unwrap_or_default()
    }
}

fn guid_keys(fields: [&Option<String>; 3]) -> Vec<String> {
    let mut keys: Vec<String> = fields
        .into_iter()
        .flatten()
        .map(|g| GuidKey::new(g).as_str().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

pub(crate) fn timestamp_column(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Installation => "installed_at",
        RecordKind::Preassembly => "preassembled_at",
    }
}

/// Column list for `SELECT`s into [`RecordRow`].
pub(crate) fn select_columns(kind: RecordKind) -> String {
    format!(
        "id, project_id, guid, guid_ifc, guid_ms, assembly_mark, product_name, \
         {} AS recorded_at, recorded_by, team, method, notes, photo_urls",
        timestamp_column(kind)
    )
}

/// A record to create, either kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecord {
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub guid_ifc: Option<String>,
    #[serde(default)]
    pub guid_ms: Option<String>,
    #[serde(default)]
    pub assembly_mark: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    /// Installation or preassembly time.
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub recorded_by: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| normalize_guid(&v)).filter(|v| !v.is_empty())
}

impl NewRecord {
    /// Strip `urn:uuid:` prefixes and blank GUID fields; at least one GUID
    /// must remain.
    pub fn normalized(mut self) -> Result<Self, CoreError> {
        self.guid = clean(self.guid);
        self.guid_ifc = clean(self.guid_ifc);
        self.guid_ms = clean(self.guid_ms);
        if self.guid.is_none() && self.guid_ifc.is_none() && self.guid_ms.is_none() {
            return Err(CoreError::MissingGuid);
        }
        Ok(self)
    }

    /// The GUID to name the object by, IFC column first.
    pub fn display_guid(&self) -> &str {
        self.guid_ifc
            .as_deref()
            .or(self.guid.as_deref())
            .or(self.guid_ms.as_deref())
            .unwrap_or_default()
    }

    /// Distinct lower-cased GUIDs of the record, for matching against
    /// existing rows.
    pub fn guid_keys(&self) -> Vec<String> {
        guid_keys([&self.guid, &self.guid_ifc, &self.guid_ms])
    }
}

/// Editable fields of an existing record. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub at: Option<OffsetDateTime>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.at.is_none() && self.notes.is_none() && self.method.is_none() && self.team.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn new_record() -> NewRecord {
        NewRecord {
            guid: Some(" urn:uuid:550E8400-E29B-41D4-A716-446655440000 ".to_string()),
            guid_ifc: Some("1L3eG0ufj1rASMH6PLH000".to_string()),
            guid_ms: Some("   ".to_string()),
            assembly_mark: Some("W-101".to_string()),
            product_name: None,
            at: datetime!(2024-05-02 10:15 UTC),
            recorded_by: "site@example.com".to_string(),
            team: None,
            method: None,
            notes: None,
            photo_urls: Vec::new(),
        }
    }

    #[test]
    fn normalizes_guid_fields() {
        let record = new_record().normalized().unwrap();
        assert_eq!(record.guid.as_deref(), Some("550E8400-E29B-41D4-A716-446655440000"));
        assert_eq!(record.guid_ms, None);
        assert_eq!(
            record.guid_keys(),
            vec![
                "1l3eg0ufj1rasmh6plh000".to_string(),
                "550e8400-e29b-41d4-a716-446655440000".to_string()
            ]
        );
    }

    #[test]
    fn record_without_guid_is_rejected() {
        let mut record = new_record();
        record.guid = None;
        record.guid_ifc = Some(String::new());
        assert_eq!(record.normalized().unwrap_err(), CoreError::MissingGuid);
    }

    #[test]
    fn patch_parses_from_json() {
        let patch: RecordPatch =
            serde_json::from_str(r#"{"at":"2024-05-03T08:00:00Z","notes":"moved"}"#).unwrap();
        assert_eq!(patch.at, Some(datetime!(2024-05-03 8:00 UTC)));
        assert!(!patch.is_empty());
        assert!(RecordPatch::default().is_empty());
    }

    #[test]
    fn select_uses_kind_timestamp() {
        assert!(select_columns(RecordKind::Preassembly).contains("preassembled_at AS recorded_at"));
    }
}
