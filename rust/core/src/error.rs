// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for progress tracking operations.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the coloring and record pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A GUID string could not be converted between IFC and UUID form.
    #[error("Invalid GUID '{guid}': {reason}")]
    InvalidGuid { guid: String, reason: &'static str },

    /// A date or month key did not parse.
    #[error("Invalid date key '{0}'")]
    InvalidDateKey(String),

    /// The host viewer rejected or failed a call.
    #[error("Viewer error: {0}")]
    Viewer(String),

    /// A preassembly must happen strictly before the installation of the same object.
    #[error("Preassembly at {preassembled_at} is not before installation at {installed_at}")]
    PreassemblyNotBeforeInstallation {
        preassembled_at: String,
        installed_at: String,
    },

    /// A record has no usable GUID field.
    #[error("Record has no GUID")]
    MissingGuid,

    /// Playback was started without any items.
    #[error("Nothing to play back")]
    EmptyPlayback,

    /// Seek position past the end of the playback list.
    #[error("Playback index {index} out of range (len {len})")]
    PlaybackOutOfRange { index: usize, len: usize },

    /// A destructive action was executed without the required confirmations.
    #[error("Bulk delete not confirmed: {confirmations} of 2 confirmations given")]
    NotConfirmed { confirmations: u8 },

    /// A confirmation was used after it already executed.
    #[error("Bulk delete already executed")]
    AlreadyExecuted,
}
