// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sequential reveal of installations in recorded order.
//!
//! The state machine only tracks position and state. Timing (the delay
//! between steps) belongs to whoever drives it; the browser bridge uses
//! timeouts, tests call [`Playback::step`] directly.

use std::str::FromStr;

use rustc_hash::FxHashSet;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::color::Classification;
use crate::engine::DesiredColors;
use crate::error::{Error, Result};
use crate::guid::{normalize_guid, GuidKey};
use crate::records::TrackedRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Fixed delay presets between two steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PlaybackSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
    VeryFast,
}

impl PlaybackSpeed {
    pub fn delay_ms(self) -> u32 {
        match self {
            PlaybackSpeed::Slow => 2000,
            PlaybackSpeed::Normal => 1000,
            PlaybackSpeed::Fast => 500,
            PlaybackSpeed::VeryFast => 150,
        }
    }
}

impl FromStr for PlaybackSpeed {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "slow" => Ok(PlaybackSpeed::Slow),
            "normal" => Ok(PlaybackSpeed::Normal),
            "fast" => Ok(PlaybackSpeed::Fast),
            "very_fast" | "veryfast" | "very-fast" => Ok(PlaybackSpeed::VeryFast),
            other => Err(format!("unknown playback speed '{other}'")),
        }
    }
}

/// One revealable object.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaybackItem {
    pub record_id: Uuid,
    pub key: GuidKey,
    /// Preferred GUID in the spelling the viewer should be asked with.
    pub guid: String,
    /// Every GUID column of the record. The scene may know the object by
    /// any of them.
    pub guids: Vec<String>,
    pub keys: Vec<GuidKey>,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct Playback {
    items: Vec<PlaybackItem>,
    /// Index of the last revealed item.
    position: Option<usize>,
    state: PlaybackState,
    speed: PlaybackSpeed,
}

impl Playback {
    /// Items sorted by timestamp, ties broken by record id. Records without a
    /// usable GUID are skipped.
    pub fn from_records<R: TrackedRecord>(records: &[R]) -> Self {
        let items = records
            .iter()
            .filter_map(|record| {
                let identity = record.identity()?;
                let mut seen: FxHashSet<GuidKey> = FxHashSet::default();
                let guids: Vec<String> = record
                    .guid_candidates()
                    .into_iter()
                    .flatten()
                    .map(normalize_guid)
                    .filter(|g| !g.is_empty() && seen.insert(GuidKey::new(g)))
                    .collect();
                Some(PlaybackItem {
                    record_id: record.record_id(),
                    key: identity.key(),
                    guid: identity.guid,
                    guids,
                    keys: record.keys(),
                    timestamp: record.timestamp(),
                })
            })
            .collect();
        Self::from_items(items)
    }

    pub fn from_items(mut items: Vec<PlaybackItem>) -> Self {
        items.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.record_id.cmp(&b.record_id))
        });
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn items(&self) -> &[PlaybackItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.speed = speed;
    }

    pub fn delay_ms(&self) -> u32 {
        self.speed.delay_ms()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.position, Some(p) if p + 1 >= self.items.len())
    }

    /// Start from the beginning when stopped, resume when paused.
    pub fn play(&mut self) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::EmptyPlayback);
        }
        match self.state {
            PlaybackState::Playing => {}
            PlaybackState::Paused => self.state = PlaybackState::Playing,
            PlaybackState::Stopped => {
                if self.is_finished() {
                    self.position = None;
                }
                self.state = PlaybackState::Playing;
            }
        }
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Stop and rewind.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.position = None;
    }

    /// Reveal the next item. Returns `None` when not playing or when the list
    /// is exhausted, in which case playback stops but keeps its position.
    pub fn step(&mut self) -> Option<&PlaybackItem> {
        if self.state != PlaybackState::Playing {
            return None;
        }
        let next = self.position.map_or(0, |p| p + 1);
        if next >= self.items.len() {
            self.state = PlaybackState::Stopped;
            return None;
        }
        self.position = Some(next);
        self.items.get(next)
    }

    /// Jump to `index` (inclusive) and return the cumulative classification
    /// of everything revealed up to it.
    pub fn seek(&mut self, index: usize) -> Result<DesiredColors> {
        if index >= self.items.len() {
            return Err(Error::PlaybackOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        self.position = Some(index);
        Ok(self.revealed())
    }

    /// Every item up to the current position, installed.
    pub fn revealed(&self) -> DesiredColors {
        let end = self.position.map_or(0, |p| p + 1);
        self.items[..end.min(self.items.len())]
            .iter()
            .flat_map(|item| item.keys.iter().cloned())
            .map(|key| (key, Classification::Installed))
            .collect()
    }

    pub fn current(&self) -> Option<&PlaybackItem> {
        self.position.and_then(|p| self.items.get(p))
    }
}
