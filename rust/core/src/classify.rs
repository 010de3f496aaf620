// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Desired-classification builders for the different coloring passes.
//!
//! Every pass starts from the scene (every known object white) and overlays
//! the records it cares about. The result goes through the same
//! [`ColorStateEngine`](crate::engine::ColorStateEngine) regardless of pass.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use time::{OffsetDateTime, UtcOffset};

use crate::color::{generate_date_colors, Classification, Rgb};
use crate::dates::{day_key, month_key};
use crate::engine::DesiredColors;
use crate::guid::GuidKey;
use crate::records::TrackedRecord;

/// Calendar granularity for bucket coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Granularity {
    Day,
    Month,
}

/// Bucket coloring result: per-object classification plus the legend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketColoring {
    pub desired: DesiredColors,
    /// Bucket key → color, sorted by key.
    pub legend: BTreeMap<String, Rgb>,
    /// Bucket key → number of objects in it.
    pub counts: BTreeMap<String, usize>,
}

fn white_scene<'a, I>(scene: I) -> DesiredColors
where
    I: IntoIterator<Item = &'a GuidKey>,
{
    scene
        .into_iter()
        .map(|key| (key.clone(), Classification::White))
        .collect()
}

fn overlay<R: TrackedRecord>(desired: &mut DesiredColors, records: &[R], classification: Classification) {
    for record in records {
        for key in record.keys() {
            desired.insert(key, classification);
        }
    }
}

/// Scene white, installed objects installed.
pub fn installation_classification<'a, I, R>(scene: I, installed: &[R]) -> DesiredColors
where
    I: IntoIterator<Item = &'a GuidKey>,
    R: TrackedRecord,
{
    let mut desired = white_scene(scene);
    overlay(&mut desired, installed, Classification::Installed);
    desired
}

/// Scene white, preassembled objects preassembly.
pub fn preassembly_classification<'a, I, R>(scene: I, preassembled: &[R]) -> DesiredColors
where
    I: IntoIterator<Item = &'a GuidKey>,
    R: TrackedRecord,
{
    let mut desired = white_scene(scene);
    overlay(&mut desired, preassembled, Classification::Preassembly);
    desired
}

/// Scene white, preassembled objects preassembly, installed objects installed.
/// Installation wins when an object has both.
pub fn status_classification<'a, I, A, B>(scene: I, installed: &[A], preassembled: &[B]) -> DesiredColors
where
    I: IntoIterator<Item = &'a GuidKey>,
    A: TrackedRecord,
    B: TrackedRecord,
{
    let mut desired = white_scene(scene);
    overlay(&mut desired, preassembled, Classification::Preassembly);
    overlay(&mut desired, installed, Classification::Installed);
    desired
}

/// One generated color per calendar bucket of the records' timestamps.
///
/// An object with several records is placed in the bucket of its latest one.
pub fn bucket_classification<'a, I, R>(
    scene: I,
    records: &[R],
    granularity: Granularity,
    offset: UtcOffset,
) -> BucketColoring
where
    I: IntoIterator<Item = &'a GuidKey>,
    R: TrackedRecord,
{
    let bucket_of = |ts: OffsetDateTime| match granularity {
        Granularity::Day => day_key(ts, offset),
        Granularity::Month => month_key(ts, offset),
    };

    let mut latest: FxHashMap<GuidKey, OffsetDateTime> = FxHashMap::default();
    // One entry per object, however many GUID columns its records carry
    let mut objects: FxHashSet<GuidKey> = FxHashSet::default();
    for record in records {
        objects.extend(record.key());
        let ts = record.timestamp();
        for key in record.keys() {
            latest
                .entry(key)
                .and_modify(|existing| {
                    if ts > *existing {
                        *existing = ts;
                    }
                })
                .or_insert(ts);
        }
    }

    let buckets: FxHashMap<GuidKey, String> = latest
        .into_iter()
        .map(|(key, ts)| (key, bucket_of(ts)))
        .collect();
    let keys: Vec<&str> = buckets.values().map(String::as_str).collect();
    let legend = generate_date_colors(&keys);

    let mut desired = white_scene(scene);
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for (key, bucket) in buckets {
        if let Some(color) = legend.get(&bucket) {
            if objects.contains(&key) {
                *counts.entry(bucket).or_default() += 1;
            }
            desired.insert(key, Classification::Bucket(*color));
        }
    }

    BucketColoring {
        desired,
        legend,
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::fixtures::{installed, preassembled};
    use time::macros::{datetime, offset};

    fn scene(guids: &[&str]) -> Vec<GuidKey> {
        guids.iter().map(|g| GuidKey::new(g)).collect()
    }

    #[test]
    fn installed_over_white_scene() {
        let scene = scene(&["a1", "b2", "d4"]);
        let at = datetime!(2024-01-01 9:00 UTC);
        let records = vec![installed("A1", at), installed("b2", at), installed("c3", at)];

        let desired = installation_classification(&scene, &records);
        assert_eq!(desired[&GuidKey::new("a1")], Classification::Installed);
        assert_eq!(desired[&GuidKey::new("b2")], Classification::Installed);
        assert_eq!(desired[&GuidKey::new("d4")], Classification::White);
    }

    #[test]
    fn installation_beats_preassembly() {
        let scene = scene(&["a", "b", "c"]);
        let at = datetime!(2024-01-01 9:00 UTC);
        let desired = status_classification(
            &scene,
            &[installed("a", at)],
            &[preassembled("a", at), preassembled("b", at)],
        );
        assert_eq!(desired[&GuidKey::new("a")], Classification::Installed);
        assert_eq!(desired[&GuidKey::new("b")], Classification::Preassembly);
        assert_eq!(desired[&GuidKey::new("c")], Classification::White);
    }

    #[test]
    fn day_buckets_get_distinct_colors() {
        let scene = scene(&["a", "b", "c", "d"]);
        let records = vec![
            installed("a", datetime!(2024-01-01 9:00 UTC)),
            installed("b", datetime!(2024-01-01 15:00 UTC)),
            installed("c", datetime!(2024-01-02 9:00 UTC)),
        ];

        let coloring = bucket_classification(&scene, &records, Granularity::Day, offset!(UTC));
        assert_eq!(coloring.legend.len(), 2);
        assert_eq!(coloring.counts["2024-01-01"], 2);
        assert_eq!(coloring.counts["2024-01-02"], 1);
        assert_eq!(
            coloring.desired[&GuidKey::new("a")],
            coloring.desired[&GuidKey::new("b")]
        );
        assert_ne!(
            coloring.desired[&GuidKey::new("a")],
            coloring.desired[&GuidKey::new("c")]
        );
        assert_eq!(coloring.desired[&GuidKey::new("d")], Classification::White);
    }

    #[test]
    fn object_with_two_guid_columns_counts_once() {
        let mut record = installed("550e8400-e29b-41d4-a716-446655440000", datetime!(2024-01-01 9:00 UTC));
        record.guid_ifc = Some("1L3eG0ufj1rASMH6PLH000".to_string());

        let coloring = bucket_classification(
            std::iter::empty::<&GuidKey>(),
            &[record],
            Granularity::Day,
            offset!(UTC),
        );
        assert_eq!(coloring.counts["2024-01-01"], 1);
        assert_eq!(coloring.desired.len(), 2);
    }

    #[test]
    fn month_bucket_uses_latest_record() {
        let records = vec![
            installed("a", datetime!(2024-01-31 9:00 UTC)),
            installed("A", datetime!(2024-02-02 9:00 UTC)),
        ];
        let coloring = bucket_classification(
            std::iter::empty::<&GuidKey>(),
            &records,
            Granularity::Month,
            offset!(UTC),
        );
        assert_eq!(coloring.legend.keys().collect::<Vec<_>>(), vec!["2024-02"]);
    }
}
