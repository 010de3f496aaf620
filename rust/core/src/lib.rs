// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Site-Progress Core
//!
//! GUID reconciliation and incremental coloring for construction progress
//! shown in a 3D BIM viewer.
//!
//! ## Overview
//!
//! - **GUID normalization**: IFC 22-char and Microsoft-style identifiers,
//!   `urn:uuid:` prefixes, case-insensitive keys, IFC ⇄ UUID conversion
//! - **Object location**: GUID → (model, runtime id) with a session cache
//!   that follows the set of loaded models
//! - **Color state**: diff against the last applied classification, batched
//!   per model and color
//! - **Passes**: installed, preassembly, status, per-day and per-month coloring
//! - **Playback**: sequential reveal of installations in recorded order
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use site_progress_core::{EngineConfig, PollingConfig, ProgressSession};
//!
//! let mut session = ProgressSession::new(viewer, EngineConfig::default(), PollingConfig::default());
//! let report = session.apply_status_coloring(&installed, &preassembled).await?;
//! println!("{} objects recolored", report.instructions);
//! ```
//!
//! The viewer is anything implementing [`ViewerBridge`]. The browser adapter
//! lives in `site-progress-wasm`; tests use [`testing::MockViewer`].
//!
//! ## Feature Flags
//!
//! - `serde`: Serialization for records, reports and configuration

pub mod classify;
pub mod color;
pub mod config;
pub mod confirm;
pub mod dates;
pub mod engine;
pub mod error;
pub mod guid;
pub mod locator;
pub mod playback;
pub mod polling;
pub mod records;
pub mod session;
pub mod testing;
pub mod viewer;

pub use classify::{
    bucket_classification, installation_classification, preassembly_classification,
    status_classification, BucketColoring, Granularity,
};
pub use color::{generate_date_colors, hsl_to_rgb, Classification, Palette, Rgb};
pub use config::{EngineConfig, PollingConfig, DEFAULT_BATCH_SIZE};
pub use confirm::{BulkDeleteConfirmation, BulkDeleteTarget, ConfirmationStage};
pub use dates::{day_key, month_key, DateScope};
pub use engine::{ApplyReport, ColorBatch, ColorPlan, ColorStateEngine, DesiredColors};
pub use error::{Error, Result};
pub use guid::{
    classify_guid, ifc_to_uuid, normalize_guid, uuid_to_ifc, GuidKey, GuidKind, ObjectIdentity,
};
pub use locator::{FoundObjects, ModelObjectRef, ObjectLocator, SelectedObject};
pub use playback::{Playback, PlaybackItem, PlaybackSpeed, PlaybackState};
pub use polling::{AssemblySelectionGuard, PollGuard, SelectionWatcher};
pub use records::{
    installation_for, validate_order, validate_preassembly, InstalledRecord, PreassemblyRecord,
    RecordKind, TrackedRecord,
};
pub use session::{BucketReport, ProgressSession};
pub use viewer::{ColorState, ModelInfo, ModelObjects, ObjectSelector, RuntimeId, ViewerBridge};
