// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tunables for the coloring engine and the polling loops.

use crate::color::Palette;

/// Default upper bound on runtime ids per `set_object_state` call.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Coloring engine configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct EngineConfig {
    /// Maximum runtime ids per viewer call. Zero is treated as one.
    pub batch_size: usize,
    pub palette: Palette,
    /// Chunk size for reverse GUID lookups during a scene scan.
    pub scan_chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            palette: Palette::default(),
            scan_chunk_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

/// Polling intervals for the selection watchers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct PollingConfig {
    /// Model selection watcher interval.
    pub selection_interval_ms: u32,
    /// Assembly-selection-mode guard interval.
    pub assembly_guard_interval_ms: u32,
    /// Minimum gap between two runs of the same watcher, on top of the
    /// re-entrancy flag.
    pub min_gap_ms: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            selection_interval_ms: 1000,
            assembly_guard_interval_ms: 2000,
            min_gap_ms: 500,
        }
    }
}
