// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Incremental color application.
//!
//! The engine remembers the classification it last applied to every object
//! and, on the next pass, only sends the objects whose classification changed.
//! Pending updates are grouped per `(model, classification)` and split into
//! bounded batches so one call never exceeds the viewer's payload limit.
//!
//! When nothing has been applied yet the engine first restores every object's
//! own color and then applies the whole desired map.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::color::Classification;
use crate::config::EngineConfig;
use crate::guid::GuidKey;
use crate::locator::FoundObjects;
use crate::viewer::{ColorState, ObjectSelector, RuntimeId, ViewerBridge};

/// Desired classification per object.
pub type DesiredColors = FxHashMap<GuidKey, Classification>;

/// One `set_object_state` call worth of objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorBatch {
    pub model_id: String,
    pub classification: Classification,
    pub guids: Vec<GuidKey>,
    pub runtime_ids: Vec<RuntimeId>,
}

impl ColorBatch {
    pub fn len(&self) -> usize {
        self.runtime_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runtime_ids.is_empty()
    }
}

/// What a pass is going to send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorPlan {
    /// Restore every object's own color before the batches.
    pub reset: bool,
    pub batches: Vec<ColorBatch>,
    /// Keys the pass covers (desired and present in the scene).
    pub covered: Vec<GuidKey>,
}

impl ColorPlan {
    /// Number of per-object color instructions.
    pub fn instruction_count(&self) -> usize {
        self.batches.iter().map(ColorBatch::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        !self.reset && self.batches.is_empty()
    }
}

/// Outcome of [`ColorStateEngine::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ApplyReport {
    pub reset: bool,
    pub reset_failed: bool,
    pub instructions: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub failed_objects: usize,
}

/// Holds the last-applied classification and turns desired maps into minimal updates.
#[derive(Debug, Default)]
pub struct ColorStateEngine {
    last_state: FxHashMap<GuidKey, Classification>,
    config: EngineConfig,
}

impl ColorStateEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            last_state: FxHashMap::default(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn last_state(&self) -> &FxHashMap<GuidKey, Classification> {
        &self.last_state
    }

    /// Classification currently shown for a GUID, any casing.
    pub fn classification_of(&self, guid: &str) -> Option<Classification> {
        self.last_state.get(&GuidKey::new(guid)).copied()
    }

    /// `false` means the next pass resets the whole scene first.
    pub fn is_primed(&self) -> bool {
        !self.last_state.is_empty()
    }

    /// Forget everything applied so far; the next pass goes the full-reset path.
    pub fn reset(&mut self) {
        self.last_state.clear();
    }

    /// Compute the updates needed to move the scene to `desired`.
    pub fn plan(&self, found: &FoundObjects, desired: &DesiredColors) -> ColorPlan {
        let reset = self.last_state.is_empty();
        let batch_size = self.config.effective_batch_size();

        let mut groups: BTreeMap<(&str, Classification), Vec<(RuntimeId, &GuidKey)>> =
            BTreeMap::new();
        let mut covered = Vec::new();

        for (key, classification) in desired {
            let Some(object) = found.get(key) else {
                continue;
            };
            covered.push(key.clone());
            if !reset && self.last_state.get(key) == Some(classification) {
                continue;
            }
            groups
                .entry((object.model_id.as_str(), *classification))
                .or_default()
                .push((object.runtime_id, key));
        }

        let mut batches = Vec::new();
        for ((model_id, classification), mut members) in groups {
            members.sort_unstable_by_key(|(runtime_id, _)| *runtime_id);
            for chunk in members.chunks(batch_size) {
                batches.push(ColorBatch {
                    model_id: model_id.to_string(),
                    classification,
                    guids: chunk.iter().map(|(_, key)| (*key).clone()).collect(),
                    runtime_ids: chunk.iter().map(|(runtime_id, _)| *runtime_id).collect(),
                });
            }
        }

        covered.sort_unstable();
        ColorPlan {
            reset,
            batches,
            covered,
        }
    }

    /// Move the scene to `desired`, sending only what changed.
    ///
    /// A failed batch is logged and skipped; its objects are left out of the
    /// stored state so the next pass sends them again.
    pub async fn apply<V: ViewerBridge>(
        &mut self,
        viewer: &V,
        found: &FoundObjects,
        desired: &DesiredColors,
    ) -> ApplyReport {
        let plan = self.plan(found, desired);
        let mut report = ApplyReport {
            reset: plan.reset,
            instructions: plan.instruction_count(),
            batches: plan.batches.len(),
            ..ApplyReport::default()
        };

        if plan.reset {
            if let Err(e) = viewer
                .set_object_state(&ObjectSelector::All, ColorState::Reset)
                .await
            {
                tracing::warn!(error = %e, "Scene color reset failed");
                report.reset_failed = true;
            }
        }

        let mut failed: FxHashSet<&GuidKey> = FxHashSet::default();
        for batch in &plan.batches {
            let color = self.config.palette.color_of(&batch.classification);
            let selector = ObjectSelector::single(&batch.model_id, batch.runtime_ids.clone());
            if let Err(e) = viewer
                .set_object_state(&selector, ColorState::Color(color))
                .await
            {
                tracing::warn!(
                    model_id = %batch.model_id,
                    classification = batch.classification.tag(),
                    objects = batch.len(),
                    error = %e,
                    "Color batch failed"
                );
                report.failed_batches += 1;
                report.failed_objects += batch.len();
                failed.extend(batch.guids.iter());
            }
        }

        if report.reset_failed {
            // Scene state is unknown; take the full path again next time
            self.last_state.clear();
        } else {
            self.last_state = plan
                .covered
                .iter()
                .filter(|key| !failed.contains(key))
                .filter_map(|key| desired.get(key).map(|c| (key.clone(), *c)))
                .collect();
        }

        tracing::debug!(
            reset = report.reset,
            instructions = report.instructions,
            batches = report.batches,
            failed_batches = report.failed_batches,
            "Applied color pass"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Palette, Rgb};
    use crate::locator::ModelObjectRef;
    use crate::testing::MockViewer;

    fn found(entries: &[(&str, &str, RuntimeId)]) -> FoundObjects {
        entries
            .iter()
            .map(|(guid, model, id)| {
                (
                    GuidKey::new(guid),
                    ModelObjectRef {
                        model_id: model.to_string(),
                        runtime_id: *id,
                    },
                )
            })
            .collect()
    }

    fn desired(entries: &[(&str, Classification)]) -> DesiredColors {
        entries
            .iter()
            .map(|(guid, c)| (GuidKey::new(guid), *c))
            .collect()
    }

    #[test]
    fn first_plan_resets_and_covers_everything() {
        let engine = ColorStateEngine::default();
        let found = found(&[("a", "m1", 1), ("b", "m1", 2), ("c", "m2", 1)]);
        let desired = desired(&[
            ("a", Classification::Installed),
            ("b", Classification::White),
            ("c", Classification::Installed),
            ("not-in-scene", Classification::Installed),
        ]);

        let plan = engine.plan(&found, &desired);
        assert!(plan.reset);
        assert_eq!(plan.instruction_count(), 3);
        assert_eq!(plan.batches.len(), 3);
    }

    #[test]
    fn batches_are_bounded() {
        let engine = ColorStateEngine::new(EngineConfig {
            batch_size: 2,
            ..EngineConfig::default()
        });
        let found = found(&[("a", "m1", 1), ("b", "m1", 2), ("c", "m1", 3), ("d", "m1", 4), ("e", "m1", 5)]);
        let desired = desired(&[
            ("a", Classification::Installed),
            ("b", Classification::Installed),
            ("c", Classification::Installed),
            ("d", Classification::Installed),
            ("e", Classification::Installed),
        ]);

        let plan = engine.plan(&found, &desired);
        let sizes: Vec<usize> = plan.batches.iter().map(ColorBatch::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(plan.batches[0].runtime_ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn reset_precedes_colors_on_first_pass() {
        let viewer = MockViewer::new();
        let mut engine = ColorStateEngine::default();
        let found = found(&[("a", "m1", 1), ("b", "m1", 2)]);
        let desired = desired(&[("a", Classification::Installed), ("b", Classification::White)]);

        let report = engine.apply(&viewer, &found, &desired).await;
        assert!(report.reset);

        let calls = viewer.color_calls();
        assert_eq!(calls[0], (ObjectSelector::All, ColorState::Reset));
        assert!(calls[1..]
            .iter()
            .all(|(_, color)| matches!(color, ColorState::Color(_))));
        assert_eq!(viewer.colored_object_count(), 2);
    }

    #[tokio::test]
    async fn second_identical_pass_is_empty() {
        let viewer = MockViewer::new();
        let mut engine = ColorStateEngine::default();
        let found = found(&[("a", "m1", 1), ("b", "m1", 2)]);
        let desired = desired(&[("a", Classification::Installed), ("B", Classification::White)]);

        engine.apply(&viewer, &found, &desired).await;
        viewer.clear_calls();

        let report = engine.apply(&viewer, &found, &desired).await;
        assert!(!report.reset);
        assert_eq!(report.instructions, 0);
        assert!(viewer.calls().is_empty());
    }

    #[tokio::test]
    async fn diff_sends_only_changes() {
        let viewer = MockViewer::new();
        let mut engine = ColorStateEngine::default();
        let entries: Vec<(String, String, RuntimeId)> = (0..10)
            .map(|i| (format!("g{i}"), "m1".to_string(), i as RuntimeId))
            .collect();
        let found: FoundObjects = entries
            .iter()
            .map(|(g, m, id)| {
                (
                    GuidKey::new(g),
                    ModelObjectRef {
                        model_id: m.clone(),
                        runtime_id: *id,
                    },
                )
            })
            .collect();
        let mut desired: DesiredColors = found
            .keys()
            .map(|k| (k.clone(), Classification::White))
            .collect();
        engine.apply(&viewer, &found, &desired).await;
        viewer.clear_calls();

        for i in [2, 5, 7] {
            desired.insert(GuidKey::new(&format!("G{i}")), Classification::Installed);
        }
        let report = engine.apply(&viewer, &found, &desired).await;

        assert_eq!(report.instructions, 3);
        assert_eq!(viewer.colored_object_count(), 3);
        assert_eq!(
            engine.classification_of("g5"),
            Some(Classification::Installed)
        );
    }

    #[tokio::test]
    async fn failed_batch_does_not_stop_others_and_is_retried() {
        let viewer = MockViewer::new();
        let palette = Palette::default();
        viewer.fail_color(palette.preassembly);
        let mut engine = ColorStateEngine::default();
        let found = found(&[("a", "m1", 1), ("b", "m1", 2)]);
        let desired = desired(&[
            ("a", Classification::Installed),
            ("b", Classification::Preassembly),
        ]);

        let report = engine.apply(&viewer, &found, &desired).await;
        assert_eq!(report.failed_batches, 1);
        assert_eq!(report.batches, 2);
        assert_eq!(engine.classification_of("a"), Some(Classification::Installed));
        assert_eq!(engine.classification_of("b"), None);

        // Viewer recovers: only the failed object is sent again
        let viewer = MockViewer::new();
        let report = engine.apply(&viewer, &found, &desired).await;
        assert_eq!(report.instructions, 1);
        assert_eq!(report.failed_batches, 0);
        assert_eq!(
            viewer.color_calls(),
            vec![(
                ObjectSelector::single("m1", vec![2]),
                ColorState::Color(palette.preassembly)
            )]
        );
    }

    #[tokio::test]
    async fn failed_reset_keeps_full_path() {
        let viewer = MockViewer::new();
        viewer.fail_reset(true);
        let mut engine = ColorStateEngine::default();
        let found = found(&[("a", "m1", 1)]);
        let desired = desired(&[("a", Classification::Bucket(Rgb::new(1, 2, 3)))]);

        let report = engine.apply(&viewer, &found, &desired).await;
        assert!(report.reset_failed);
        assert!(!engine.is_primed());
    }
}
