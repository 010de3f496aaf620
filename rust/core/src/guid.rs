// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GUID normalization, shape classification and IFC/UUID conversion.
//!
//! Two incompatible identifier formats reach the tracker: the IFC-native
//! 22-character compressed GlobalId and the Microsoft-style 128-bit hex GUID.
//! Both are stored and looked up through [`GuidKey`], which is the trimmed,
//! prefix-free, lower-cased form of whatever the data source supplied.

use std::fmt;

use uuid::Uuid;

use crate::error::{Error, Result};

/// IFC GlobalId base-64 alphabet (note: not RFC 4648).
const IFC_ALPHABET: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_$";

/// Length of a compressed IFC GlobalId.
pub const IFC_GUID_LEN: usize = 22;

/// Shape of an identifier string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum GuidKind {
    /// 22 characters of `[0-9A-Za-z_$]`.
    Ifc,
    /// 8-4-4-4-12 hex, or 32 hex digits without hyphens.
    Ms,
    Unknown,
}

impl GuidKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GuidKind::Ifc => "IFC",
            GuidKind::Ms => "MS",
            GuidKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for GuidKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip a leading `urn:` and optional `uuid:` (any casing) and trim whitespace.
///
/// Input without the prefix comes back trimmed but otherwise unchanged.
pub fn normalize_guid(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(rest) = strip_prefix_ignore_case(s, "urn:") {
        s = rest;
    }
    if let Some(rest) = strip_prefix_ignore_case(s, "uuid:") {
        s = rest;
    }
    s.trim().to_string()
}

#[inline]
fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Classify an identifier by shape only. Existence and uniqueness are not checked.
pub fn classify_guid(raw: &str) -> GuidKind {
    let s = normalize_guid(raw);
    if is_ifc_shape(&s) {
        GuidKind::Ifc
    } else if is_ms_shape(&s) {
        GuidKind::Ms
    } else {
        GuidKind::Unknown
    }
}

#[inline]
fn is_ifc_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn is_ifc_shape(s: &str) -> bool {
    s.len() == IFC_GUID_LEN && s.bytes().all(is_ifc_char)
}

fn is_ms_shape(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes.len() {
        32 => bytes.iter().all(u8::is_ascii_hexdigit),
        36 => bytes.iter().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => *b == b'-',
            _ => b.is_ascii_hexdigit(),
        }),
        _ => false,
    }
}

/// Case-insensitive lookup key shared by every GUID-keyed map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct GuidKey(String);

impl GuidKey {
    pub fn new(raw: &str) -> Self {
        GuidKey(normalize_guid(raw).to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn kind(&self) -> GuidKind {
        classify_guid(&self.0)
    }
}

impl From<&str> for GuidKey {
    fn from(raw: &str) -> Self {
        GuidKey::new(raw)
    }
}

impl From<&String> for GuidKey {
    fn from(raw: &String) -> Self {
        GuidKey::new(raw)
    }
}

impl fmt::Display for GuidKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized GUID plus its shape classification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectIdentity {
    /// Normalized GUID in the casing it was supplied in.
    pub guid: String,
    pub kind: GuidKind,
}

impl ObjectIdentity {
    pub fn parse(raw: &str) -> Self {
        let guid = normalize_guid(raw);
        let kind = classify_guid(&guid);
        Self { guid, kind }
    }

    pub fn key(&self) -> GuidKey {
        GuidKey::new(&self.guid)
    }
}

/// Pick the best GUID among several candidate fields of one record.
///
/// IFC-shaped candidates win over MS-shaped ones, which win over anything else
/// non-empty. Among equals the earlier candidate wins.
pub fn preferred_guid<'a, I>(candidates: I) -> Option<ObjectIdentity>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut best: Option<ObjectIdentity> = None;
    for candidate in candidates.into_iter().flatten() {
        let identity = ObjectIdentity::parse(candidate);
        if identity.guid.is_empty() {
            continue;
        }
        let better = match &best {
            None => true,
            Some(current) => rank(identity.kind) < rank(current.kind),
        };
        if better {
            best = Some(identity);
        }
    }
    best
}

fn rank(kind: GuidKind) -> u8 {
    match kind {
        GuidKind::Ifc => 0,
        GuidKind::Ms => 1,
        GuidKind::Unknown => 2,
    }
}

/// Expand a compressed IFC GlobalId to canonical hyphenated UUID form (lower-case).
pub fn ifc_to_uuid(ifc: &str) -> Result<String> {
    let s = normalize_guid(ifc);
    if s.len() != IFC_GUID_LEN {
        return Err(Error::InvalidGuid {
            guid: s,
            reason: "IFC GUID must be 22 characters",
        });
    }

    let mut value: u128 = 0;
    for (i, b) in s.bytes().enumerate() {
        let digit = match IFC_ALPHABET.iter().position(|c| *c == b) {
            Some(d) => d as u128,
            None => {
                return Err(Error::InvalidGuid {
                    guid: s,
                    reason: "character outside IFC alphabet",
                })
            }
        };
        // First character carries only the top 2 bits of the 128-bit value
        if i == 0 && digit > 3 {
            return Err(Error::InvalidGuid {
                guid: s,
                reason: "first character out of range",
            });
        }
        value = (value << 6) | digit;
    }

    Ok(Uuid::from_u128(value).hyphenated().to_string())
}

/// Compress a UUID (hyphenated, simple or `urn:uuid:` form) to a 22-character IFC GlobalId.
pub fn uuid_to_ifc(ms: &str) -> Result<String> {
    let s = normalize_guid(ms);
    if !is_ms_shape(&s) {
        return Err(Error::InvalidGuid {
            guid: s,
            reason: "not a 32-digit hex GUID",
        });
    }
    let uuid = Uuid::parse_str(&s).map_err(|_| Error::InvalidGuid {
        guid: s.clone(),
        reason: "not a 32-digit hex GUID",
    })?;

    let mut value = uuid.as_u128();
    let mut out = [0u8; IFC_GUID_LEN];
    for slot in out.iter_mut().rev() {
        *slot = IFC_ALPHABET[(value & 63) as usize];
        value >>= 6;
    }
    // Alphabet is pure ASCII
    Ok(out.iter().map(|b| *b as char).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_urn_prefix() {
        assert_eq!(
            normalize_guid("urn:uuid:550E8400-E29B-41D4-A716-446655440000"),
            "550E8400-E29B-41D4-A716-446655440000"
        );
        assert_eq!(
            normalize_guid("  URN:UUID:550e8400-e29b-41d4-a716-446655440000 "),
            "550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(normalize_guid("1a2B3c4D5e6F7g8H9i0Jkl"), "1a2B3c4D5e6F7g8H9i0Jkl");
        assert_eq!(normalize_guid(""), "");
    }

    #[test]
    fn classify_known_shapes() {
        assert_eq!(
            classify_guid("550e8400-e29b-41d4-a716-446655440000"),
            GuidKind::Ms
        );
        assert_eq!(
            classify_guid("550E8400E29B41D4A716446655440000"),
            GuidKind::Ms
        );
        assert_eq!(classify_guid("1a2B3c4D5e6F7g8H9i0Jkl"), GuidKind::Ifc);
        assert_eq!(classify_guid("3$_$$$$$$$$$$$$$$$$$$$"), GuidKind::Ifc);
        assert_eq!(classify_guid("not-a-guid"), GuidKind::Unknown);
        assert_eq!(classify_guid(""), GuidKind::Unknown);
        // Hyphens in the wrong places
        assert_eq!(
            classify_guid("550e8400e-29b-41d4-a716-446655440000"),
            GuidKind::Unknown
        );
    }

    #[test]
    fn classify_is_stable() {
        for _ in 0..3 {
            assert_eq!(classify_guid("1a2B3c4D5e6F7g8H9i0Jkl"), GuidKind::Ifc);
        }
    }

    #[test]
    fn key_ignores_case_and_prefix() {
        let a = GuidKey::new("urn:uuid:550E8400-E29B-41D4-A716-446655440000");
        let b = GuidKey::new("550e8400-e29b-41d4-a716-446655440000");
        let c = GuidKey::new("550e8400-E29B-41d4-A716-446655440000");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn preferred_guid_prefers_ifc_then_ms() {
        let picked = preferred_guid([
            Some("550e8400-e29b-41d4-a716-446655440000"),
            Some("1L3eG0ufj1rASMH6PLH000"),
            None,
        ])
        .unwrap();
        assert_eq!(picked.kind, GuidKind::Ifc);
        assert_eq!(picked.guid, "1L3eG0ufj1rASMH6PLH000");

        let picked = preferred_guid([Some("A-17"), Some("550e8400-e29b-41d4-a716-446655440000")]).unwrap();
        assert_eq!(picked.kind, GuidKind::Ms);

        let picked = preferred_guid([Some("  "), Some("A-17")]).unwrap();
        assert_eq!(picked.guid, "A-17");

        assert!(preferred_guid([None, Some("")]).is_none());
    }

    #[test]
    fn ifc_uuid_known_vector() {
        assert_eq!(
            ifc_to_uuid("1L3eG0ufj1rASMH6PLH000").unwrap(),
            "550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(
            uuid_to_ifc("550e8400-e29b-41d4-a716-446655440000").unwrap(),
            "1L3eG0ufj1rASMH6PLH000"
        );
        assert_eq!(
            uuid_to_ifc("urn:uuid:22E6739F-79E4-40BB-A965-3DDA451A2255").unwrap(),
            "0YvdEVUUH0kwbbFTf56Y9L"
        );
    }

    #[test]
    fn ifc_uuid_extremes() {
        assert_eq!(
            ifc_to_uuid("3$$$$$$$$$$$$$$$$$$$$$").unwrap(),
            "ffffffff-ffff-ffff-ffff-ffffffffffff"
        );
        assert_eq!(
            uuid_to_ifc("00000000000000000000000000000000").unwrap(),
            "0000000000000000000000"
        );
    }

    #[test]
    fn ifc_to_uuid_rejects_bad_input() {
        assert!(matches!(
            ifc_to_uuid("short"),
            Err(Error::InvalidGuid { .. })
        ));
        // '4' in first position would overflow 128 bits
        assert!(ifc_to_uuid("4000000000000000000000").is_err());
        assert!(ifc_to_uuid("0000000000000000000-00").is_err());
        assert!(uuid_to_ifc("not-a-guid").is_err());
    }
}
