// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GUID → scene object resolution with a session cache.
//!
//! Resolving GUIDs means one conversion call per loaded model, which is the
//! expensive part of a coloring pass. The locator keeps every answer (hits and
//! misses) until the set of loaded models changes or the cache is invalidated
//! explicitly, so repeated passes only pay for GUIDs they have not asked about.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::Result;
use crate::guid::{normalize_guid, GuidKey, GuidKind, ObjectIdentity};
use crate::viewer::{ModelObjects, RuntimeId, ViewerBridge};

/// Transient handle into the live scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelObjectRef {
    pub model_id: String,
    pub runtime_id: RuntimeId,
}

/// Lower-cased GUID → scene object.
pub type FoundObjects = FxHashMap<GuidKey, ModelObjectRef>;

/// One selected object, resolved back to its GUID where possible.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectedObject {
    pub model_id: String,
    pub runtime_id: RuntimeId,
    pub guid: Option<String>,
    pub kind: GuidKind,
}

/// Session cache of GUID lookups against the loaded models.
#[derive(Debug, Default)]
pub struct ObjectLocator {
    found: FoundObjects,
    unfound: FxHashSet<GuidKey>,
    /// Sorted model ids the cache was built against.
    models: Vec<String>,
    scene_scanned: bool,
    generation: u64,
}

impl ObjectLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn found(&self) -> &FoundObjects {
        &self.found
    }

    pub fn get(&self, guid: &str) -> Option<&ModelObjectRef> {
        self.found.get(&GuidKey::new(guid))
    }

    pub fn is_unfound(&self, guid: &str) -> bool {
        self.unfound.contains(&GuidKey::new(guid))
    }

    /// GUIDs asked for but not present in any loaded model, sorted.
    pub fn unfound(&self) -> Vec<GuidKey> {
        let mut keys: Vec<GuidKey> = self.unfound.iter().cloned().collect();
        keys.sort();
        keys
    }

    /// Keys of every object seen in the scene so far. Complete only after
    /// [`scan_scene`](Self::scan_scene).
    pub fn scene_keys(&self) -> impl Iterator<Item = &GuidKey> {
        self.found.keys()
    }

    pub fn is_scene_scanned(&self) -> bool {
        self.scene_scanned
    }

    /// Bumped on every invalidation. Anything derived from the cache must be
    /// rebuilt when this changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.found.len()
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    /// Drop every cached answer.
    pub fn invalidate(&mut self) {
        tracing::debug!(
            found = self.found.len(),
            unfound = self.unfound.len(),
            "Invalidating object locator cache"
        );
        self.found.clear();
        self.unfound.clear();
        self.scene_scanned = false;
        self.generation += 1;
    }

    /// Refresh the loaded model list, invalidating the cache if it changed.
    /// Returns the current model ids.
    pub async fn sync_models<V: ViewerBridge>(&mut self, viewer: &V) -> Result<Vec<String>> {
        let mut ids: Vec<String> = viewer
            .get_models()
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        ids.sort();
        ids.dedup();

        if ids != self.models {
            if !self.models.is_empty() || !self.found.is_empty() || !self.unfound.is_empty() {
                tracing::info!(
                    before = self.models.len(),
                    after = ids.len(),
                    "Loaded models changed"
                );
                self.invalidate();
            }
            self.models = ids.clone();
        }
        Ok(ids)
    }

    /// Resolve GUIDs against every loaded model.
    ///
    /// Returns the subset of `guids` present in the scene. GUIDs that resolve
    /// nowhere are not an error; they are remembered as unfound.
    pub async fn find_objects<V, S>(&mut self, viewer: &V, guids: &[S]) -> Result<FoundObjects>
    where
        V: ViewerBridge,
        S: AsRef<str>,
    {
        let models = self.sync_models(viewer).await?;

        // Query with the normalized spelling; the viewer may be case-sensitive
        let mut seen: FxHashSet<GuidKey> = FxHashSet::default();
        let mut pending: Vec<(GuidKey, String)> = Vec::new();
        for raw in guids {
            let query = normalize_guid(raw.as_ref());
            if query.is_empty() {
                continue;
            }
            let key = GuidKey::new(&query);
            if !seen.insert(key.clone()) {
                continue;
            }
            if self.found.contains_key(&key) || self.unfound.contains(&key) {
                continue;
            }
            pending.push((key, query));
        }

        if !pending.is_empty() && self.scene_scanned {
            // A complete scan already saw every object
            self.unfound.extend(pending.drain(..).map(|(key, _)| key));
        }

        if !pending.is_empty() {
            let asked = pending.len();
            for model_id in &models {
                if pending.is_empty() {
                    break;
                }
                let queries: Vec<String> = pending.iter().map(|(_, q)| q.clone()).collect();
                let runtime_ids = match viewer.convert_to_runtime_ids(model_id, &queries).await {
                    Ok(ids) => ids,
                    Err(e) => {
                        tracing::warn!(model_id = %model_id, error = %e, "GUID lookup failed for model, skipping");
                        continue;
                    }
                };
                if runtime_ids.len() != queries.len() {
                    tracing::warn!(
                        model_id = %model_id,
                        expected = queries.len(),
                        got = runtime_ids.len(),
                        "Viewer returned misaligned runtime ids"
                    );
                }

                let mut still_pending = Vec::with_capacity(pending.len());
                for (i, (key, query)) in pending.into_iter().enumerate() {
                    match runtime_ids.get(i).copied().flatten() {
                        Some(runtime_id) => {
                            self.found.insert(
                                key,
                                ModelObjectRef {
                                    model_id: model_id.clone(),
                                    runtime_id,
                                },
                            );
                        }
                        None => still_pending.push((key, query)),
                    }
                }
                pending = still_pending;
            }

            tracing::debug!(
                asked = asked,
                unresolved = pending.len(),
                models = models.len(),
                "Resolved GUIDs against loaded models"
            );
            self.unfound.extend(pending.into_iter().map(|(key, _)| key));
        }

        Ok(seen
            .into_iter()
            .filter_map(|key| self.found.get(&key).cloned().map(|obj| (key, obj)))
            .collect())
    }

    /// Walk every object of every loaded model and cache its GUID.
    ///
    /// Returns the number of scene objects known afterwards. A second call is
    /// free until the cache is invalidated.
    pub async fn scan_scene<V: ViewerBridge>(&mut self, viewer: &V, chunk_size: usize) -> Result<usize> {
        let models = self.sync_models(viewer).await?;
        if self.scene_scanned {
            return Ok(self.found.len());
        }

        let chunk_size = chunk_size.max(1);
        let mut complete = true;
        for model_id in &models {
            let runtime_ids = match viewer.list_objects(model_id).await {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!(model_id = %model_id, error = %e, "Listing model objects failed, skipping");
                    complete = false;
                    continue;
                }
            };
            for chunk in runtime_ids.chunks(chunk_size) {
                let guids = match viewer.convert_to_object_ids(model_id, chunk).await {
                    Ok(guids) => guids,
                    Err(e) => {
                        tracing::warn!(model_id = %model_id, error = %e, "Reverse GUID lookup failed, skipping chunk");
                        complete = false;
                        continue;
                    }
                };
                for (runtime_id, guid) in chunk.iter().zip(guids) {
                    let Some(guid) = guid else { continue };
                    let key = GuidKey::new(&guid);
                    if key.is_empty() {
                        continue;
                    }
                    self.unfound.remove(&key);
                    self.found.entry(key).or_insert_with(|| ModelObjectRef {
                        model_id: model_id.clone(),
                        runtime_id: *runtime_id,
                    });
                }
            }
        }

        // An incomplete scan is retried on the next call
        self.scene_scanned = complete;
        tracing::info!(
            objects = self.found.len(),
            models = models.len(),
            complete = complete,
            "Scene scan finished"
        );
        Ok(self.found.len())
    }

    /// The viewer's current selection, resolved back to GUIDs.
    pub async fn resolve_selection<V: ViewerBridge>(&mut self, viewer: &V) -> Result<Vec<SelectedObject>> {
        let selection = viewer.get_selection().await?;
        self.resolve_objects(viewer, &selection).await
    }

    /// Resolve runtime ids to GUIDs, caching every answer.
    pub async fn resolve_objects<V: ViewerBridge>(
        &mut self,
        viewer: &V,
        groups: &[ModelObjects],
    ) -> Result<Vec<SelectedObject>> {
        let mut selected = Vec::new();
        for group in groups {
            if group.runtime_ids.is_empty() {
                continue;
            }
            let guids = match viewer
                .convert_to_object_ids(&group.model_id, &group.runtime_ids)
                .await
            {
                Ok(guids) => guids,
                Err(e) => {
                    tracing::warn!(model_id = %group.model_id, error = %e, "Selection GUID lookup failed");
                    vec![None; group.runtime_ids.len()]
                }
            };

            for (i, runtime_id) in group.runtime_ids.iter().enumerate() {
                let guid = guids.get(i).cloned().flatten().map(|g| normalize_guid(&g));
                let kind = match &guid {
                    Some(g) => {
                        let identity = ObjectIdentity::parse(g);
                        let key = identity.key();
                        self.unfound.remove(&key);
                        self.found.entry(key).or_insert_with(|| ModelObjectRef {
                            model_id: group.model_id.clone(),
                            runtime_id: *runtime_id,
                        });
                        identity.kind
                    }
                    None => GuidKind::Unknown,
                };
                selected.push(SelectedObject {
                    model_id: group.model_id.clone(),
                    runtime_id: *runtime_id,
                    guid,
                    kind,
                });
            }
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockViewer, ViewerCall};

    fn viewer() -> MockViewer {
        MockViewer::new()
            .with_model("m1", &["1L3eG0ufj1rASMH6PLH000", "aaaa"])
            .with_model("m2", &["bbbb"])
    }

    #[tokio::test]
    async fn find_returns_only_present_guids() {
        let viewer = viewer();
        let mut locator = ObjectLocator::new();

        let found = locator
            .find_objects(&viewer, &["aaaa", "BBBB", "missing"])
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[&GuidKey::new("aaaa")].model_id, "m1");
        assert_eq!(found[&GuidKey::new("bbbb")].model_id, "m2");
        assert!(locator.is_unfound("MISSING"));
        assert_eq!(locator.unfound(), vec![GuidKey::new("missing")]);
    }

    #[tokio::test]
    async fn lookups_ignore_case() {
        let viewer = viewer();
        let mut locator = ObjectLocator::new();
        locator.find_objects(&viewer, &["AAAA"]).await.unwrap();

        for variant in ["aaaa", "AAAA", "aAaA", "urn:uuid:aaaa"] {
            assert_eq!(locator.get(variant).unwrap().runtime_id, 2);
        }
    }

    #[tokio::test]
    async fn second_lookup_uses_cache() {
        let viewer = viewer();
        let mut locator = ObjectLocator::new();
        locator.find_objects(&viewer, &["aaaa", "zzzz"]).await.unwrap();
        viewer.clear_calls();

        let found = locator.find_objects(&viewer, &["AAAA", "zzzz"]).await.unwrap();
        assert_eq!(found.len(), 1);
        let conversions = viewer
            .calls()
            .into_iter()
            .filter(|c| matches!(c, ViewerCall::ConvertToRuntimeIds { .. }))
            .count();
        assert_eq!(conversions, 0);
    }

    #[tokio::test]
    async fn model_change_invalidates_cache() {
        let viewer = viewer();
        let mut locator = ObjectLocator::new();
        locator.find_objects(&viewer, &["aaaa", "cccc"]).await.unwrap();
        let before = locator.generation();

        viewer.add_model("m3", &["cccc"]);
        let found = locator.find_objects(&viewer, &["cccc"]).await.unwrap();

        assert!(locator.generation() > before);
        assert_eq!(found[&GuidKey::new("cccc")].model_id, "m3");
        // Previous entries were dropped with the cache
        assert!(locator.get("aaaa").is_none());
    }

    #[tokio::test]
    async fn failing_model_is_skipped() {
        let viewer = viewer();
        viewer.fail_model("m1");
        let mut locator = ObjectLocator::new();

        let found = locator.find_objects(&viewer, &["aaaa", "bbbb"]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(locator.is_unfound("aaaa"));
    }

    #[tokio::test]
    async fn scan_scene_caches_every_object() {
        let viewer = viewer();
        let mut locator = ObjectLocator::new();

        let count = locator.scan_scene(&viewer, 1).await.unwrap();
        assert_eq!(count, 3);
        assert!(locator.is_scene_scanned());
        assert!(locator.get("1l3eg0ufj1rasmh6plh000").is_some());

        viewer.clear_calls();
        assert_eq!(locator.scan_scene(&viewer, 1).await.unwrap(), 3);
        assert!(!viewer
            .calls()
            .iter()
            .any(|c| matches!(c, ViewerCall::ListObjects(_))));
    }

    #[tokio::test]
    async fn lookups_after_full_scan_skip_the_viewer() {
        let viewer = viewer();
        let mut locator = ObjectLocator::new();
        locator.scan_scene(&viewer, 10).await.unwrap();
        viewer.clear_calls();

        let found = locator.find_objects(&viewer, &["bbbb", "gone"]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(locator.is_unfound("gone"));
        assert!(!viewer
            .calls()
            .iter()
            .any(|c| matches!(c, ViewerCall::ConvertToRuntimeIds { .. })));
    }

    #[tokio::test]
    async fn incomplete_scan_is_retried() {
        let viewer = viewer();
        viewer.fail_model("m2");
        let mut locator = ObjectLocator::new();

        assert_eq!(locator.scan_scene(&viewer, 10).await.unwrap(), 2);
        assert!(!locator.is_scene_scanned());

        let viewer_ok = MockViewer::new()
            .with_model("m1", &["1L3eG0ufj1rASMH6PLH000", "aaaa"])
            .with_model("m2", &["bbbb"]);
        assert_eq!(locator.scan_scene(&viewer_ok, 10).await.unwrap(), 3);
        assert!(locator.is_scene_scanned());
    }

    #[tokio::test]
    async fn selection_resolves_to_guids() {
        let viewer = viewer();
        viewer.select("m2", &[1]);
        let mut locator = ObjectLocator::new();

        let selected = locator.resolve_selection(&viewer).await.unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].guid.as_deref(), Some("bbbb"));
        assert_eq!(locator.get("bbbb").unwrap().model_id, "m2");
    }
}
