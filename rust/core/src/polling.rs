// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic viewer watchers.
//!
//! The host viewer has no change events for selection or selection mode, so
//! both are polled. Timers live in the caller; this module only decides
//! whether a tick may run and what it should report. Time is passed in as
//! milliseconds because the browser has no monotonic `Instant`.

use std::cell::Cell;

use crate::error::Result;
use crate::locator::{ObjectLocator, SelectedObject};
use crate::viewer::{ModelObjects, ViewerBridge};

/// Suppresses overlapping and too-frequent runs of one watcher.
#[derive(Debug)]
pub struct PollGuard {
    in_flight: Cell<bool>,
    last_started: Cell<Option<f64>>,
    min_gap_ms: f64,
}

/// Held for the duration of one run; releases the guard on drop.
#[derive(Debug)]
pub struct PollTicket<'a> {
    guard: &'a PollGuard,
}

impl Drop for PollTicket<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.set(false);
    }
}

impl PollGuard {
    pub fn new(min_gap_ms: u32) -> Self {
        Self {
            in_flight: Cell::new(false),
            last_started: Cell::new(None),
            min_gap_ms: f64::from(min_gap_ms),
        }
    }

    /// A ticket if no run is in flight and the last one started at least
    /// `min_gap_ms` ago.
    pub fn try_begin(&self, now_ms: f64) -> Option<PollTicket<'_>> {
        if self.in_flight.get() {
            return None;
        }
        if let Some(last) = self.last_started.get() {
            if now_ms - last < self.min_gap_ms {
                return None;
            }
        }
        self.in_flight.set(true);
        self.last_started.set(Some(now_ms));
        Some(PollTicket { guard: self })
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.get()
    }
}

/// Reports the viewer selection whenever it changes.
#[derive(Debug)]
pub struct SelectionWatcher {
    guard: PollGuard,
    last: Option<Vec<ModelObjects>>,
}

impl SelectionWatcher {
    pub fn new(min_gap_ms: u32) -> Self {
        Self {
            guard: PollGuard::new(min_gap_ms),
            last: None,
        }
    }

    /// One tick. `Some` carries the new selection (possibly empty) when it
    /// differs from the previous tick; `None` means unchanged or skipped.
    pub async fn poll<V: ViewerBridge>(
        &mut self,
        viewer: &V,
        locator: &mut ObjectLocator,
        now_ms: f64,
    ) -> Result<Option<Vec<SelectedObject>>> {
        let Some(_ticket) = self.guard.try_begin(now_ms) else {
            return Ok(None);
        };

        let mut selection = viewer.get_selection().await?;
        for group in &mut selection {
            group.runtime_ids.sort_unstable();
        }
        selection.retain(|g| !g.runtime_ids.is_empty());
        selection.sort_by(|a, b| a.model_id.cmp(&b.model_id));

        if self.last.as_ref() == Some(&selection) {
            return Ok(None);
        }
        let resolved = locator.resolve_objects(viewer, &selection).await?;
        tracing::debug!(objects = resolved.len(), "Viewer selection changed");
        self.last = Some(selection);
        Ok(Some(resolved))
    }

    /// Forget the last selection so the next tick reports again.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Keeps the viewer in assembly selection mode while the panel is open.
#[derive(Debug)]
pub struct AssemblySelectionGuard {
    guard: PollGuard,
}

impl AssemblySelectionGuard {
    pub fn new(min_gap_ms: u32) -> Self {
        Self {
            guard: PollGuard::new(min_gap_ms),
        }
    }

    /// Re-enable assembly selection if the user turned it off. Returns true
    /// when it had to be re-enabled.
    pub async fn enforce<V: ViewerBridge>(&self, viewer: &V, now_ms: f64) -> Result<bool> {
        let Some(_ticket) = self.guard.try_begin(now_ms) else {
            return Ok(false);
        };
        if viewer.assembly_selection().await? {
            return Ok(false);
        }
        tracing::info!("Assembly selection was disabled, re-enabling");
        viewer.set_assembly_selection(true).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockViewer, ViewerCall};

    #[test]
    fn guard_blocks_overlap_and_short_gaps() {
        let guard = PollGuard::new(500);
        let ticket = guard.try_begin(0.0).unwrap();
        assert!(guard.try_begin(1000.0).is_none());
        drop(ticket);
        assert!(!guard.is_running());

        assert!(guard.try_begin(300.0).is_none());
        assert!(guard.try_begin(500.0).is_some());
    }

    #[tokio::test]
    async fn selection_reported_only_on_change() {
        let viewer = MockViewer::new().with_model("m1", &["1L3eG0ufj1rASMH6PLH000", "aaaa"]);
        let mut locator = ObjectLocator::new();
        let mut watcher = SelectionWatcher::new(0);

        // Initial empty selection is a change from "never polled"
        let first = watcher.poll(&viewer, &mut locator, 0.0).await.unwrap();
        assert_eq!(first, Some(Vec::new()));
        assert_eq!(watcher.poll(&viewer, &mut locator, 10.0).await.unwrap(), None);

        viewer.select("m1", &[2, 1]);
        let selected = watcher.poll(&viewer, &mut locator, 20.0).await.unwrap().unwrap();
        let guids: Vec<_> = selected.iter().filter_map(|s| s.guid.clone()).collect();
        assert_eq!(guids, vec!["1L3eG0ufj1rASMH6PLH000".to_string(), "aaaa".to_string()]);

        // Same selection in a different order is not a change
        viewer.select("m1", &[1, 2]);
        assert_eq!(watcher.poll(&viewer, &mut locator, 30.0).await.unwrap(), None);

        viewer.clear_selection();
        assert_eq!(
            watcher.poll(&viewer, &mut locator, 40.0).await.unwrap(),
            Some(Vec::new())
        );
    }

    #[tokio::test]
    async fn assembly_guard_reenables_mode() {
        let viewer = MockViewer::new();
        let guard = AssemblySelectionGuard::new(2000);

        assert!(guard.enforce(&viewer, 0.0).await.unwrap());
        assert!(viewer.assembly_mode());
        assert!(viewer.calls().contains(&ViewerCall::SetAssemblySelection(true)));

        viewer.set_assembly_mode(false);
        // Too soon after the last run
        assert!(!guard.enforce(&viewer, 1000.0).await.unwrap());
        assert!(guard.enforce(&viewer, 2500.0).await.unwrap());
        assert!(!guard.enforce(&viewer, 5000.0).await.unwrap());
    }
}
