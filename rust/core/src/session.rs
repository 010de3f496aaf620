// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-panel session context.
//!
//! A [`ProgressSession`] owns everything one open panel needs across calls:
//! the viewer handle, the GUID cache, the applied color state, the playback
//! list and the watchers. Every coloring entry point funnels into
//! [`ProgressSession::apply`].

use std::collections::BTreeMap;

use time::UtcOffset;

use crate::classify::{
    bucket_classification, installation_classification, preassembly_classification,
    status_classification, Granularity,
};
use crate::color::{Classification, Rgb};
use crate::config::{EngineConfig, PollingConfig};
use crate::engine::{ApplyReport, ColorStateEngine, DesiredColors};
use crate::error::Result;
use crate::guid::{normalize_guid, GuidKey};
use crate::locator::{FoundObjects, ObjectLocator, SelectedObject};
use crate::playback::{Playback, PlaybackItem};
use crate::polling::{AssemblySelectionGuard, SelectionWatcher};
use crate::records::{InstalledRecord, PreassemblyRecord, TrackedRecord};
use crate::viewer::{ModelObjects, ObjectSelector, ViewerBridge};

/// Result of a day or month coloring pass.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BucketReport {
    pub apply: ApplyReport,
    pub legend: BTreeMap<String, Rgb>,
    pub counts: BTreeMap<String, usize>,
}

pub struct ProgressSession<V> {
    viewer: V,
    locator: ObjectLocator,
    engine: ColorStateEngine,
    playback: Playback,
    selection_watcher: SelectionWatcher,
    assembly_guard: AssemblySelectionGuard,
    /// Locator generation the engine state was built against.
    colored_generation: Option<u64>,
    utc_offset: UtcOffset,
}

impl<V: ViewerBridge> ProgressSession<V> {
    pub fn new(viewer: V, engine: EngineConfig, polling: PollingConfig) -> Self {
        Self {
            viewer,
            locator: ObjectLocator::new(),
            engine: ColorStateEngine::new(engine),
            playback: Playback::default(),
            selection_watcher: SelectionWatcher::new(polling.min_gap_ms),
            assembly_guard: AssemblySelectionGuard::new(polling.min_gap_ms),
            colored_generation: None,
            utc_offset: UtcOffset::UTC,
        }
    }

    /// Offset used to bucket timestamps into calendar days and months.
    pub fn with_utc_offset(mut self, offset: UtcOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    pub fn locator(&self) -> &ObjectLocator {
        &self.locator
    }

    pub fn engine(&self) -> &ColorStateEngine {
        &self.engine
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut Playback {
        &mut self.playback
    }

    /// GUIDs asked for but absent from every loaded model.
    pub fn unfound(&self) -> Vec<GuidKey> {
        self.locator.unfound()
    }

    /// Drop the GUID cache and the applied state. The next pass resets the
    /// scene and re-resolves everything.
    pub fn invalidate(&mut self) {
        self.locator.invalidate();
        self.engine.reset();
        self.colored_generation = None;
        self.selection_watcher.reset();
    }

    /// Move the scene to `desired`.
    pub async fn apply(&mut self, desired: &DesiredColors) -> Result<ApplyReport> {
        let keys: Vec<&str> = desired.keys().map(GuidKey::as_str).collect();
        let found = self.locator.find_objects(&self.viewer, &keys).await?;

        // Runtime ids from an older scene mean nothing now
        let generation = self.locator.generation();
        if self.colored_generation != Some(generation) {
            if self.engine.is_primed() {
                tracing::info!("Scene changed since last pass, recoloring from scratch");
            }
            self.engine.reset();
            self.colored_generation = Some(generation);
        }

        Ok(self.engine.apply(&self.viewer, &found, desired).await)
    }

    async fn scan_scene(&mut self) -> Result<usize> {
        let chunk_size = self.engine.config().scan_chunk_size;
        self.locator.scan_scene(&self.viewer, chunk_size).await
    }

    pub async fn apply_installation_coloring(&mut self, installed: &[InstalledRecord]) -> Result<ApplyReport> {
        self.scan_scene().await?;
        let desired = installation_classification(self.locator.scene_keys(), installed);
        self.apply(&desired).await
    }

    pub async fn apply_preassembly_coloring(
        &mut self,
        preassembled: &[PreassemblyRecord],
    ) -> Result<ApplyReport> {
        self.scan_scene().await?;
        let desired = preassembly_classification(self.locator.scene_keys(), preassembled);
        self.apply(&desired).await
    }

    /// White scene, preassembled purple, installed green.
    pub async fn apply_status_coloring(
        &mut self,
        installed: &[InstalledRecord],
        preassembled: &[PreassemblyRecord],
    ) -> Result<ApplyReport> {
        self.scan_scene().await?;
        let desired = status_classification(self.locator.scene_keys(), installed, preassembled);
        let report = self.apply(&desired).await?;
        tracing::info!(
            installed = installed.len(),
            preassembled = preassembled.len(),
            instructions = report.instructions,
            "Status coloring applied"
        );
        Ok(report)
    }

    pub async fn apply_day_coloring<R: TrackedRecord>(&mut self, records: &[R]) -> Result<BucketReport> {
        self.apply_bucket_coloring(records, Granularity::Day).await
    }

    pub async fn apply_month_coloring<R: TrackedRecord>(&mut self, records: &[R]) -> Result<BucketReport> {
        self.apply_bucket_coloring(records, Granularity::Month).await
    }

    async fn apply_bucket_coloring<R: TrackedRecord>(
        &mut self,
        records: &[R],
        granularity: Granularity,
    ) -> Result<BucketReport> {
        self.scan_scene().await?;
        let coloring = bucket_classification(
            self.locator.scene_keys(),
            records,
            granularity,
            self.utc_offset,
        );
        let apply = self.apply(&coloring.desired).await?;
        Ok(BucketReport {
            apply,
            legend: coloring.legend,
            counts: coloring.counts,
        })
    }

    /// Select and frame the given objects. Returns the GUIDs that are not in
    /// any loaded model.
    pub async fn select_guids<S: AsRef<str>>(&mut self, guids: &[S]) -> Result<Vec<GuidKey>> {
        let found = self.locator.find_objects(&self.viewer, guids).await?;

        let mut missing: Vec<GuidKey> = guids
            .iter()
            .map(|g| GuidKey::new(g.as_ref()))
            .filter(|key| !key.is_empty() && !found.contains_key(key))
            .collect();
        missing.sort();
        missing.dedup();

        if !found.is_empty() {
            let selector = selector_for(&found);
            self.viewer.set_selection(&selector).await?;
            self.viewer.set_camera(&selector).await?;
        }
        Ok(missing)
    }

    pub async fn resolve_selection(&mut self) -> Result<Vec<SelectedObject>> {
        self.locator.resolve_selection(&self.viewer).await
    }

    /// Replace the playback list. Keeps the chosen speed; the list starts stopped.
    pub fn load_playback(&mut self, installed: &[InstalledRecord]) -> usize {
        let speed = self.playback.speed();
        self.playback = Playback::from_records(installed);
        self.playback.set_speed(speed);
        tracing::debug!(items = self.playback.len(), "Playback loaded");
        self.playback.len()
    }

    /// Reveal the next item: color it, select it and frame it.
    pub async fn playback_step(&mut self) -> Result<Option<PlaybackItem>> {
        let Some(item) = self.playback.step().cloned() else {
            return Ok(None);
        };
        self.apply_revealed().await?;

        let found = self
            .locator
            .find_objects(&self.viewer, &item.guids)
            .await?;
        if !found.is_empty() {
            let selector = selector_for(&found);
            self.viewer.set_selection(&selector).await?;
            self.viewer.set_camera(&selector).await?;
        }
        Ok(Some(item))
    }

    /// Jump to `index` and recolor everything revealed up to it.
    pub async fn playback_seek(&mut self, index: usize) -> Result<ApplyReport> {
        self.playback.seek(index)?;
        self.apply_revealed().await
    }

    async fn apply_revealed(&mut self) -> Result<ApplyReport> {
        self.scan_scene().await?;
        let mut desired: DesiredColors = self
            .locator
            .scene_keys()
            .map(|key| (key.clone(), Classification::White))
            .collect();
        desired.extend(self.playback.revealed());
        self.apply(&desired).await
    }

    /// One selection-watcher tick; `Some` when the selection changed.
    pub async fn poll_selection(&mut self, now_ms: f64) -> Result<Option<Vec<SelectedObject>>> {
        self.selection_watcher
            .poll(&self.viewer, &mut self.locator, now_ms)
            .await
    }

    /// One assembly-guard tick; true when selection mode had to be re-enabled.
    pub async fn enforce_assembly_selection(&self, now_ms: f64) -> Result<bool> {
        self.assembly_guard.enforce(&self.viewer, now_ms).await
    }
}

/// Group found objects by model, runtime ids sorted, models in id order.
fn selector_for(found: &FoundObjects) -> ObjectSelector {
    let mut by_model: BTreeMap<&str, Vec<_>> = BTreeMap::new();
    for object in found.values() {
        by_model
            .entry(object.model_id.as_str())
            .or_default()
            .push(object.runtime_id);
    }
    ObjectSelector::Objects(
        by_model
            .into_iter()
            .map(|(model_id, mut runtime_ids)| {
                runtime_ids.sort_unstable();
                ModelObjects {
                    model_id: model_id.to_string(),
                    runtime_ids,
                }
            })
            .collect(),
    )
}

/// Trimmed, prefix-stripped GUIDs, empty ones dropped.
pub fn clean_guids<S: AsRef<str>>(guids: &[S]) -> Vec<String> {
    guids
        .iter()
        .map(|g| normalize_guid(g.as_ref()))
        .filter(|g| !g.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::fixtures::{hours, installed, preassembled};
    use crate::testing::{MockViewer, ViewerCall};
    use crate::viewer::ColorState;
    use time::macros::datetime;

    fn session() -> ProgressSession<MockViewer> {
        let viewer = MockViewer::new()
            .with_model("m1", &["a1", "b2"])
            .with_model("m2", &["d4"]);
        ProgressSession::new(viewer, EngineConfig::default(), PollingConfig::default())
    }

    #[tokio::test]
    async fn status_pass_then_incremental_update() {
        let mut session = session();
        let at = datetime!(2024-01-01 9:00 UTC);

        let report = session
            .apply_status_coloring(&[installed("a1", at)], &[preassembled("b2", at)])
            .await
            .unwrap();
        assert!(report.reset);
        assert_eq!(report.instructions, 3);

        session.viewer().clear_calls();
        let report = session
            .apply_status_coloring(
                &[installed("a1", at), installed("b2", at + hours(1))],
                &[preassembled("b2", at)],
            )
            .await
            .unwrap();
        assert!(!report.reset);
        assert_eq!(report.instructions, 1);
        assert_eq!(
            session.engine().classification_of("B2"),
            Some(Classification::Installed)
        );
    }

    #[tokio::test]
    async fn model_change_forces_full_reset() {
        let mut session = session();
        let at = datetime!(2024-01-01 9:00 UTC);
        let records = vec![installed("a1", at)];
        session.apply_installation_coloring(&records).await.unwrap();

        session.viewer().add_model("m3", &["e5"]);
        let report = session.apply_installation_coloring(&records).await.unwrap();
        assert!(report.reset);
        assert_eq!(report.instructions, 4);
    }

    #[tokio::test]
    async fn select_reports_missing_guids() {
        let mut session = session();
        let missing = session.select_guids(&["A1", "d4", "nope"]).await.unwrap();
        assert_eq!(missing, vec![GuidKey::new("nope")]);

        let calls = session.viewer().calls();
        let selection = calls.iter().find_map(|c| match c {
            ViewerCall::SetSelection(selector) => Some(selector.clone()),
            _ => None,
        });
        assert_eq!(selection.and_then(|s| s.object_count()), Some(2));
        assert!(calls.iter().any(|c| matches!(c, ViewerCall::SetCamera(_))));
    }

    #[tokio::test]
    async fn playback_reveals_in_order() {
        let mut session = session();
        let t0 = datetime!(2024-01-01 9:00 UTC);
        session.load_playback(&[installed("d4", t0 + hours(1)), installed("a1", t0)]);
        session.playback_mut().play().unwrap();

        let first = session.playback_step().await.unwrap().unwrap();
        assert_eq!(first.guid, "a1");
        assert_eq!(session.engine().classification_of("a1"), Some(Classification::Installed));
        assert_eq!(session.engine().classification_of("d4"), Some(Classification::White));

        session.viewer().clear_calls();
        let second = session.playback_step().await.unwrap().unwrap();
        assert_eq!(second.guid, "d4");
        // Only the newly revealed object is recolored
        assert_eq!(session.viewer().colored_object_count(), 1);

        assert!(session.playback_step().await.unwrap().is_none());

        let report = session.playback_seek(0).await.unwrap();
        assert_eq!(report.instructions, 1);
        assert_eq!(session.engine().classification_of("d4"), Some(Classification::White));
    }

    #[tokio::test]
    async fn day_coloring_returns_legend() {
        let mut session = session();
        let report = session
            .apply_day_coloring(&[
                installed("a1", datetime!(2024-01-01 9:00 UTC)),
                installed("b2", datetime!(2024-01-02 9:00 UTC)),
            ])
            .await
            .unwrap();
        assert_eq!(report.legend.len(), 2);
        assert_eq!(report.apply.instructions, 3);
    }

    #[tokio::test]
    async fn invalidate_resets_scene() {
        let mut session = session();
        let records = vec![installed("a1", datetime!(2024-01-01 9:00 UTC))];
        session.apply_installation_coloring(&records).await.unwrap();
        session.invalidate();
        assert!(!session.engine().is_primed());

        session.viewer().clear_calls();
        session.apply_installation_coloring(&records).await.unwrap();
        assert_eq!(
            session.viewer().color_calls()[0],
            (ObjectSelector::All, ColorState::Reset)
        );
    }

    #[test]
    fn clean_guids_drops_blanks() {
        assert_eq!(
            clean_guids(&[" urn:uuid:ABC ", "", "  "]),
            vec!["ABC".to_string()]
        );
    }
}
