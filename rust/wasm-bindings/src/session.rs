// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `ProgressSession` class exported to the panel.
//!
//! Every operation takes the session lock for its whole duration, so two
//! coloring passes, a playback step and a watcher tick never interleave
//! their viewer calls. Timers are plain `gloo-timers` futures; a loop exits
//! as soon as its generation counter no longer matches.

use std::cell::Cell;
use std::rc::Rc;
use std::str::FromStr;

use futures_util::lock::Mutex;
use gloo_timers::future::TimeoutFuture;
use serde::{Deserialize, Serialize};
use site_progress_core::{
    EngineConfig, InstalledRecord, PlaybackSpeed, PlaybackState, PollingConfig, PreassemblyRecord,
    ProgressSession, RecordKind,
};
use time::UtcOffset;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

use crate::utils::{callback, core_error, debug, notify, now_ms, to_js, warn};
use crate::viewer::{HostViewer, JsViewer};

type Shared = Rc<Mutex<ProgressSession<JsViewer>>>;

/// Options accepted by the constructor. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SessionOptions {
    engine: EngineConfig,
    polling: PollingConfig,
    utc_offset_minutes: i32,
}

impl SessionOptions {
    fn from_js(options: JsValue) -> Result<Self, JsValue> {
        if options.is_undefined() || options.is_null() {
            return Ok(Self::default());
        }
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| JsError::new(&format!("Invalid session options: {e}")).into())
    }

    fn offset(&self) -> Result<UtcOffset, time::error::ComponentRange> {
        UtcOffset::from_whole_seconds(self.utc_offset_minutes.saturating_mul(60))
    }

    fn utc_offset(&self) -> Result<UtcOffset, JsValue> {
        self.offset()
            .map_err(|e| JsError::new(&format!("Invalid UTC offset: {e}")).into())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaybackStatus {
    state: PlaybackState,
    speed: PlaybackSpeed,
    position: Option<usize>,
    len: usize,
}

fn decode<T: serde::de::DeserializeOwned>(what: &str, value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsError::new(&format!("Invalid {what}: {e}")).into())
}

fn record_kind(kind: Option<String>) -> Result<RecordKind, JsValue> {
    match kind.as_deref() {
        None | Some("installation") => Ok(RecordKind::Installation),
        Some("preassembly") => Ok(RecordKind::Preassembly),
        Some(other) => Err(JsError::new(&format!("Unknown record kind '{other}'")).into()),
    }
}

/// Coloring, selection and playback over one host viewer.
#[wasm_bindgen(js_name = ProgressSession)]
pub struct ProgressSessionJs {
    inner: Shared,
    polling: PollingConfig,
    playback_generation: Rc<Cell<u64>>,
    watch_generation: Rc<Cell<u64>>,
}

#[wasm_bindgen(js_class = ProgressSession)]
impl ProgressSessionJs {
    /// Create a session over `viewer`.
    ///
    /// `options` may carry `engine` (`batchSize`, `palette`, `scanChunkSize`),
    /// `polling` (`selectionIntervalMs`, `assemblyGuardIntervalMs`, `minGapMs`)
    /// and `utcOffsetMinutes`.
    #[wasm_bindgen(constructor)]
    pub fn new(viewer: HostViewer, options: JsValue) -> Result<ProgressSessionJs, JsValue> {
        let options = SessionOptions::from_js(options)?;
        let offset = options.utc_offset()?;
        let session = ProgressSession::new(
            JsViewer::new(viewer),
            options.engine,
            options.polling.clone(),
        )
        .with_utc_offset(offset);

        Ok(Self {
            inner: Rc::new(Mutex::new(session)),
            polling: options.polling,
            playback_generation: Rc::new(Cell::new(0)),
            watch_generation: Rc::new(Cell::new(0)),
        })
    }

    /// Installed green, preassembled purple, everything else white.
    #[wasm_bindgen(js_name = applyStatusColoring)]
    pub fn apply_status_coloring(&self, installed: JsValue, preassembled: JsValue) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let installed: Vec<InstalledRecord> = decode("installations", installed)?;
            let preassembled: Vec<PreassemblyRecord> = decode("preassemblies", preassembled)?;
            let mut session = inner.lock().await;
            let report = session
                .apply_status_coloring(&installed, &preassembled)
                .await
                .map_err(core_error)?;
            to_js(&report)
        })
    }

    #[wasm_bindgen(js_name = applyInstallationColoring)]
    pub fn apply_installation_coloring(&self, installed: JsValue) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let installed: Vec<InstalledRecord> = decode("installations", installed)?;
            let mut session = inner.lock().await;
            let report = session
                .apply_installation_coloring(&installed)
                .await
                .map_err(core_error)?;
            to_js(&report)
        })
    }

    #[wasm_bindgen(js_name = applyPreassemblyColoring)]
    pub fn apply_preassembly_coloring(&self, preassembled: JsValue) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let preassembled: Vec<PreassemblyRecord> = decode("preassemblies", preassembled)?;
            let mut session = inner.lock().await;
            let report = session
                .apply_preassembly_coloring(&preassembled)
                .await
                .map_err(core_error)?;
            to_js(&report)
        })
    }

    /// One generated color per calendar day. `kind` is `"installation"`
    /// (default) or `"preassembly"`. Resolves to `{ apply, legend, counts }`.
    #[wasm_bindgen(js_name = applyDayColoring)]
    pub fn apply_day_coloring(&self, records: JsValue, kind: Option<String>) -> js_sys::Promise {
        self.bucket_coloring(records, kind, false)
    }

    /// Like `applyDayColoring`, one color per calendar month.
    #[wasm_bindgen(js_name = applyMonthColoring)]
    pub fn apply_month_coloring(&self, records: JsValue, kind: Option<String>) -> js_sys::Promise {
        self.bucket_coloring(records, kind, true)
    }

    fn bucket_coloring(&self, records: JsValue, kind: Option<String>, monthly: bool) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let kind = record_kind(kind)?;
            let mut session = inner.lock().await;
            let report = match (kind, monthly) {
                (RecordKind::Installation, false) => {
                    let records: Vec<InstalledRecord> = decode("installations", records)?;
                    session.apply_day_coloring(&records).await
                }
                (RecordKind::Installation, true) => {
                    let records: Vec<InstalledRecord> = decode("installations", records)?;
                    session.apply_month_coloring(&records).await
                }
                (RecordKind::Preassembly, false) => {
                    let records: Vec<PreassemblyRecord> = decode("preassemblies", records)?;
                    session.apply_day_coloring(&records).await
                }
                (RecordKind::Preassembly, true) => {
                    let records: Vec<PreassemblyRecord> = decode("preassemblies", records)?;
                    session.apply_month_coloring(&records).await
                }
            }
            .map_err(core_error)?;
            to_js(&report)
        })
    }

    /// Forget cached GUID lookups and applied colors, e.g. after a model
    /// was reloaded. The next pass recolors from scratch.
    pub fn invalidate(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            inner.lock().await.invalidate();
            Ok(JsValue::UNDEFINED)
        })
    }

    /// GUIDs requested so far that no loaded model contains.
    pub fn unfound(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let unfound = inner.lock().await.unfound();
            to_js(&unfound)
        })
    }

    /// Select and frame objects. Resolves to the GUIDs that were not found.
    #[wasm_bindgen(js_name = selectGuids)]
    pub fn select_guids(&self, guids: Vec<String>) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let missing = inner.lock().await.select_guids(&guids).await.map_err(core_error)?;
            to_js(&missing)
        })
    }

    /// Current viewer selection resolved to GUIDs.
    #[wasm_bindgen(js_name = resolveSelection)]
    pub fn resolve_selection(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let selected = inner.lock().await.resolve_selection().await.map_err(core_error)?;
            to_js(&selected)
        })
    }

    /// Replace the playback list; stops a running playback first.
    #[wasm_bindgen(js_name = playbackLoad)]
    pub fn playback_load(&self, installed: JsValue) -> js_sys::Promise {
        self.cancel_playback();
        let inner = self.inner.clone();
        future_to_promise(async move {
            let installed: Vec<InstalledRecord> = decode("installations", installed)?;
            let len = inner.lock().await.load_playback(&installed);
            Ok(JsValue::from_f64(len as f64))
        })
    }

    /// Start or resume playback.
    ///
    /// `options.onStep(item)` is called after each revealed object and
    /// `options.onEnd()` once the list is exhausted.
    #[wasm_bindgen(js_name = playbackPlay)]
    pub fn playback_play(&self, options: JsValue) -> js_sys::Promise {
        let generation = self.cancel_playback();
        let inner = self.inner.clone();
        let current = self.playback_generation.clone();
        let on_step = callback(&options, "onStep");
        let on_end = callback(&options, "onEnd");

        future_to_promise(async move {
            inner.lock().await.playback_mut().play().map_err(core_error)?;
            spawn_local(run_playback(inner, current, generation, on_step, on_end));
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = playbackPause)]
    pub fn playback_pause(&self) -> js_sys::Promise {
        self.cancel_playback();
        let inner = self.inner.clone();
        future_to_promise(async move {
            inner.lock().await.playback_mut().pause();
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Stop and rewind. Colors stay as they are until the next pass.
    #[wasm_bindgen(js_name = playbackStop)]
    pub fn playback_stop(&self) -> js_sys::Promise {
        self.cancel_playback();
        let inner = self.inner.clone();
        future_to_promise(async move {
            inner.lock().await.playback_mut().stop();
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Jump to `index` and show everything installed up to it.
    #[wasm_bindgen(js_name = playbackSeek)]
    pub fn playback_seek(&self, index: usize) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let report = inner.lock().await.playback_seek(index).await.map_err(core_error)?;
            to_js(&report)
        })
    }

    /// `slow`, `normal`, `fast` or `very_fast`. Takes effect from the next step.
    #[wasm_bindgen(js_name = playbackSetSpeed)]
    pub fn playback_set_speed(&self, speed: &str) -> Result<js_sys::Promise, JsValue> {
        let speed = PlaybackSpeed::from_str(speed).map_err(|e| JsValue::from(JsError::new(&e)))?;
        let inner = self.inner.clone();
        Ok(future_to_promise(async move {
            inner.lock().await.playback_mut().set_speed(speed);
            Ok(JsValue::UNDEFINED)
        }))
    }

    /// Resolves to `{ state, speed, position, len }`.
    #[wasm_bindgen(js_name = playbackStatus)]
    pub fn playback_status(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let session = inner.lock().await;
            let playback = session.playback();
            to_js(&PlaybackStatus {
                state: playback.state(),
                speed: playback.speed(),
                position: playback.position(),
                len: playback.len(),
            })
        })
    }

    /// Start the selection watcher and the assembly-selection guard.
    ///
    /// `options.onSelection(objects)` receives the resolved selection each
    /// time it changes. Calling this again restarts both loops.
    #[wasm_bindgen(js_name = startWatching)]
    pub fn start_watching(&self, options: JsValue) {
        let generation = bump(&self.watch_generation);
        let on_selection = callback(&options, "onSelection");

        spawn_local(watch_selection(
            self.inner.clone(),
            self.watch_generation.clone(),
            generation,
            self.polling.selection_interval_ms,
            on_selection,
        ));
        spawn_local(guard_assembly_selection(
            self.inner.clone(),
            self.watch_generation.clone(),
            generation,
            self.polling.assembly_guard_interval_ms,
        ));
    }

    #[wasm_bindgen(js_name = stopWatching)]
    pub fn stop_watching(&self) {
        bump(&self.watch_generation);
    }

    /// Stop every timer. Pending loops exit at their next wake-up.
    pub fn dispose(&self) {
        self.cancel_playback();
        bump(&self.watch_generation);
        debug("Progress session disposed");
    }

    fn cancel_playback(&self) -> u64 {
        bump(&self.playback_generation)
    }
}

fn bump(counter: &Cell<u64>) -> u64 {
    let next = counter.get().wrapping_add(1);
    counter.set(next);
    next
}

async fn run_playback(
    inner: Shared,
    current: Rc<Cell<u64>>,
    generation: u64,
    on_step: Option<js_sys::Function>,
    on_end: Option<js_sys::Function>,
) {
    loop {
        if current.get() != generation {
            return;
        }

        let (step, delay) = {
            let mut session = inner.lock().await;
            if current.get() != generation {
                return;
            }
            let step = session.playback_step().await;
            (step, session.playback().delay_ms())
        };

        match step {
            Ok(Some(item)) => match to_js(&item) {
                Ok(value) => notify(on_step.as_ref(), &value),
                Err(e) => web_sys::console::warn_2(&"Could not encode playback item:".into(), &e),
            },
            Ok(None) => {
                notify(on_end.as_ref(), &JsValue::UNDEFINED);
                return;
            }
            Err(e) => {
                warn(&format!("Playback stopped: {e}"));
                inner.lock().await.playback_mut().pause();
                return;
            }
        }

        TimeoutFuture::new(delay).await;
    }
}

async fn watch_selection(
    inner: Shared,
    current: Rc<Cell<u64>>,
    generation: u64,
    interval_ms: u32,
    on_selection: Option<js_sys::Function>,
) {
    while current.get() == generation {
        let changed = {
            let mut session = inner.lock().await;
            if current.get() != generation {
                return;
            }
            session.poll_selection(now_ms()).await
        };

        match changed {
            Ok(Some(selected)) => match to_js(&selected) {
                Ok(value) => notify(on_selection.as_ref(), &value),
                Err(e) => web_sys::console::warn_2(&"Could not encode selection:".into(), &e),
            },
            Ok(None) => {}
            Err(e) => warn(&format!("Selection poll failed: {e}")),
        }

        TimeoutFuture::new(interval_ms).await;
    }
}

async fn guard_assembly_selection(inner: Shared, current: Rc<Cell<u64>>, generation: u64, interval_ms: u32) {
    while current.get() == generation {
        let result = {
            let session = inner.lock().await;
            if current.get() != generation {
                return;
            }
            session.enforce_assembly_selection(now_ms()).await
        };

        match result {
            Ok(true) => debug("Assembly selection re-enabled"),
            Ok(false) => {}
            Err(e) => warn(&format!("Assembly selection check failed: {e}")),
        }

        TimeoutFuture::new(interval_ms).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_when_fields_are_missing() {
        let options: SessionOptions =
            serde_json::from_str(r#"{"engine":{"batchSize":250},"utcOffsetMinutes":120}"#).unwrap();
        assert_eq!(options.engine.batch_size, 250);
        assert_eq!(options.polling, PollingConfig::default());
        assert_eq!(options.utc_offset_minutes, 120);
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let options = SessionOptions {
            utc_offset_minutes: i32::MAX,
            ..SessionOptions::default()
        };
        assert!(options.offset().is_err());

        let options = SessionOptions {
            utc_offset_minutes: -90,
            ..SessionOptions::default()
        };
        assert_eq!(options.offset().unwrap().whole_minutes(), -90);
    }

    #[test]
    fn bump_returns_the_new_generation() {
        let counter = Cell::new(4);
        assert_eq!(bump(&counter), 5);
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn record_kind_defaults_to_installation() {
        assert_eq!(record_kind(None).ok(), Some(RecordKind::Installation));
        assert_eq!(
            record_kind(Some("preassembly".into())).ok(),
            Some(RecordKind::Preassembly)
        );
    }
}
