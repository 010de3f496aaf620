// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-object classification computed from stored records, for clients
//! that color without running the engine themselves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use site_progress_core::{
    bucket_classification, installation_classification, preassembly_classification,
    status_classification, BucketColoring, Classification, DesiredColors, Granularity, GuidKey,
    InstalledRecord, Palette, PreassemblyRecord, RecordKind, TrackedRecord,
};
use time::UtcOffset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Status,
    Installed,
    Preassembly,
    Day,
    Month,
}

impl Mode {
    pub fn needs_installations(self, kind: RecordKind) -> bool {
        match self {
            Mode::Status | Mode::Installed => true,
            Mode::Preassembly => false,
            Mode::Day | Mode::Month => kind == RecordKind::Installation,
        }
    }

    pub fn needs_preassemblies(self, kind: RecordKind) -> bool {
        match self {
            Mode::Status | Mode::Preassembly => true,
            Mode::Installed => false,
            Mode::Day | Mode::Month => kind == RecordKind::Preassembly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectColor {
    pub classification: Classification,
    /// `#rrggbb`
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResponse {
    pub mode: Mode,
    /// Lower-cased GUID → color. Only objects with records appear.
    pub objects: BTreeMap<String, ObjectColor>,
    /// Bucket key → `#rrggbb`, for day and month modes.
    pub legend: BTreeMap<String, String>,
    /// Bucket key → object count, for day and month modes.
    pub counts: BTreeMap<String, usize>,
}

fn buckets<R: TrackedRecord>(records: &[R], granularity: Granularity, offset: UtcOffset) -> BucketColoring {
    bucket_classification(std::iter::empty::<&GuidKey>(), records, granularity, offset)
}

pub fn classify(
    mode: Mode,
    kind: RecordKind,
    installed: &[InstalledRecord],
    preassembled: &[PreassemblyRecord],
    offset: UtcOffset,
    palette: &Palette,
) -> ClassificationResponse {
    let scene = std::iter::empty::<&GuidKey>();
    let coloring = match mode {
        Mode::Status => BucketColoring {
            desired: status_classification(scene, installed, preassembled),
            ..Default::default()
        },
        Mode::Installed => BucketColoring {
            desired: installation_classification(scene, installed),
            ..Default::default()
        },
        Mode::Preassembly => BucketColoring {
            desired: preassembly_classification(scene, preassembled),
            ..Default::default()
        },
        Mode::Day | Mode::Month => {
            let granularity = if mode == Mode::Day {
                Granularity::Day
            } else {
                Granularity::Month
            };
            match kind {
                RecordKind::Installation => buckets(installed, granularity, offset),
                RecordKind::Preassembly => buckets(preassembled, granularity, offset),
            }
        }
    };

    ClassificationResponse {
        mode,
        objects: object_colors(&coloring.desired, palette),
        legend: coloring
            .legend
            .into_iter()
            .map(|(key, rgb)| (key, rgb.to_hex()))
            .collect(),
        counts: coloring.counts,
    }
}

fn object_colors(desired: &DesiredColors, palette: &Palette) -> BTreeMap<String, ObjectColor> {
    desired
        .iter()
        .map(|(key, classification)| {
            (
                key.as_str().to_string(),
                ObjectColor {
                    classification: *classification,
                    color: palette.color_of(classification).to_hex(),
                },
            )
        })
        .collect()
}
