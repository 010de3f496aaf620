// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Installation and preassembly records as stored in the record store.

use std::fmt;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::guid::{preferred_guid, GuidKey, ObjectIdentity};

/// Which of the two record tables a row lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RecordKind {
    Installation,
    Preassembly,
}

impl RecordKind {
    pub fn table(self) -> &'static str {
        match self {
            RecordKind::Installation => "installations",
            RecordKind::Preassembly => "preassemblies",
        }
    }

    /// The kind whose dates a record of this kind is ordered against.
    pub fn counterpart(self) -> RecordKind {
        match self {
            RecordKind::Installation => RecordKind::Preassembly,
            RecordKind::Preassembly => RecordKind::Installation,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Installation => f.write_str("installation"),
            RecordKind::Preassembly => f.write_str("preassembly"),
        }
    }
}

/// A recorded installation of one model object.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstalledRecord {
    pub id: Uuid,
    pub project_id: String,
    pub guid: Option<String>,
    pub guid_ifc: Option<String>,
    pub guid_ms: Option<String>,
    pub assembly_mark: Option<String>,
    pub product_name: Option<String>,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub installed_at: OffsetDateTime,
    pub recorded_by: String,
    pub team: Option<String>,
    pub method: Option<String>,
    pub notes: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub photo_urls: Vec<String>,
}

/// A recorded preassembly of one model object.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PreassemblyRecord {
    pub id: Uuid,
    pub project_id: String,
    pub guid: Option<String>,
    pub guid_ifc: Option<String>,
    pub guid_ms: Option<String>,
    pub assembly_mark: Option<String>,
    pub product_name: Option<String>,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub preassembled_at: OffsetDateTime,
    pub recorded_by: String,
    pub team: Option<String>,
    pub method: Option<String>,
    pub notes: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub photo_urls: Vec<String>,
}

/// Common view over both record kinds.
pub trait TrackedRecord {
    fn record_id(&self) -> Uuid;

    /// GUID fields in preference order: IFC column, generic column, MS column.
    fn guid_candidates(&self) -> [Option<&str>; 3];

    fn timestamp(&self) -> OffsetDateTime;

    fn identity(&self) -> Option<ObjectIdentity> {
        preferred_guid(self.guid_candidates())
    }

    fn key(&self) -> Option<GuidKey> {
        self.identity().map(|identity| identity.key())
    }

    /// Every distinct key any GUID column maps to.
    fn keys(&self) -> Vec<GuidKey> {
        let mut keys: Vec<GuidKey> = self
            .guid_candidates()
            .into_iter()
            .flatten()
            .map(GuidKey::new)
            .filter(|k| !k.is_empty())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Whether any GUID column refers to `key`.
    fn matches(&self, key: &GuidKey) -> bool {
        self.guid_candidates()
            .into_iter()
            .flatten()
            .any(|g| GuidKey::new(g) == *key)
    }
}

impl TrackedRecord for InstalledRecord {
    fn record_id(&self) -> Uuid {
        self.id
    }

    fn guid_candidates(&self) -> [Option<&str>; 3] {
        [
            self.guid_ifc.as_deref(),
            self.guid.as_deref(),
            self.guid_ms.as_deref(),
        ]
    }

    fn timestamp(&self) -> OffsetDateTime {
        self.installed_at
    }
}

impl TrackedRecord for PreassemblyRecord {
    fn record_id(&self) -> Uuid {
        self.id
    }

    fn guid_candidates(&self) -> [Option<&str>; 3] {
        [
            self.guid_ifc.as_deref(),
            self.guid.as_deref(),
            self.guid_ms.as_deref(),
        ]
    }

    fn timestamp(&self) -> OffsetDateTime {
        self.preassembled_at
    }
}

/// The installation record of the object `key` refers to, if any.
pub fn installation_for<'a>(
    key: &GuidKey,
    installations: &'a [InstalledRecord],
) -> Option<&'a InstalledRecord> {
    installations.iter().find(|record| record.matches(key))
}

/// A preassembly must be strictly earlier than the installation of the same
/// object.
pub fn validate_order(preassembled_at: OffsetDateTime, installed_at: OffsetDateTime) -> Result<()> {
    if preassembled_at >= installed_at {
        return Err(Error::PreassemblyNotBeforeInstallation {
            preassembled_at: preassembled_at.to_string(),
            installed_at: installed_at.to_string(),
        });
    }
    Ok(())
}

/// A preassembly may only be recorded strictly before the object's installation.
pub fn validate_preassembly(
    preassembled_at: OffsetDateTime,
    installation: Option<&InstalledRecord>,
) -> Result<()> {
    match installation {
        Some(installed) => validate_order(preassembled_at, installed.installed_at),
        None => Ok(()),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::guid::GuidKind;
    use time::macros::datetime;

    #[test]
    fn identity_prefers_ifc_column() {
        let mut record = installed("550e8400-e29b-41d4-a716-446655440000", datetime!(2024-01-01 8:00 UTC));
        record.guid_ifc = Some("1L3eG0ufj1rASMH6PLH000".to_string());

        let identity = record.identity().unwrap();
        assert_eq!(identity.kind, GuidKind::Ifc);
        assert_eq!(record.keys().len(), 2);
        assert!(record.matches(&GuidKey::new("550E8400-E29B-41D4-A716-446655440000")));
    }

    #[test]
    fn record_without_guid_has_no_key() {
        let mut record = installed("", datetime!(2024-01-01 8:00 UTC));
        record.guid = None;
        assert!(record.key().is_none());
        assert!(record.keys().is_empty());
    }

    #[test]
    fn preassembly_must_be_strictly_earlier() {
        let at = datetime!(2024-01-10 12:00 UTC);
        let installs = vec![installed("A1", at)];
        let install = installation_for(&GuidKey::new("a1"), &installs);

        assert!(validate_preassembly(at - hours(1), install).is_ok());
        assert!(matches!(
            validate_preassembly(at, install),
            Err(Error::PreassemblyNotBeforeInstallation { .. })
        ));
        assert!(validate_preassembly(at + hours(1), install).is_err());
        // No installation yet: anything goes
        assert!(validate_preassembly(at + hours(1), None).is_ok());
    }
}
