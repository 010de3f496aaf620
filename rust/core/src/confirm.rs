// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Two-step confirmation for bulk deletes.

use crate::dates::DateScope;
use crate::error::{Error, Result};
use crate::records::RecordKind;

/// Confirmations required before a bulk delete may run.
pub const REQUIRED_CONFIRMATIONS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConfirmationStage {
    /// Created, nothing confirmed yet.
    Requested,
    /// First confirmation given.
    Armed,
    /// Second confirmation given, ready to execute.
    Confirmed,
    Executed,
}

/// What a bulk delete removes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BulkDeleteTarget {
    pub project_id: String,
    pub kind: RecordKind,
    pub scope: DateScope,
}

/// A pending destructive action that runs only after two confirmations.
#[derive(Debug, Clone)]
pub struct BulkDeleteConfirmation {
    target: BulkDeleteTarget,
    stage: ConfirmationStage,
}

impl BulkDeleteConfirmation {
    pub fn new(target: BulkDeleteTarget) -> Self {
        Self {
            target,
            stage: ConfirmationStage::Requested,
        }
    }

    pub fn target(&self) -> &BulkDeleteTarget {
        &self.target
    }

    pub fn stage(&self) -> ConfirmationStage {
        self.stage
    }

    pub fn confirmations(&self) -> u8 {
        match self.stage {
            ConfirmationStage::Requested => 0,
            ConfirmationStage::Armed => 1,
            ConfirmationStage::Confirmed | ConfirmationStage::Executed => 2,
        }
    }

    /// Record one confirmation and return the new stage. Extra confirmations
    /// on a confirmed request are no-ops.
    pub fn confirm(&mut self) -> Result<ConfirmationStage> {
        self.stage = match self.stage {
            ConfirmationStage::Requested => ConfirmationStage::Armed,
            ConfirmationStage::Armed | ConfirmationStage::Confirmed => ConfirmationStage::Confirmed,
            ConfirmationStage::Executed => return Err(Error::AlreadyExecuted),
        };
        Ok(self.stage)
    }

    /// Hand out the target for deletion. Succeeds exactly once, and only
    /// after two confirmations.
    pub fn execute(&mut self) -> Result<&BulkDeleteTarget> {
        match self.stage {
            ConfirmationStage::Confirmed => {
                self.stage = ConfirmationStage::Executed;
                tracing::info!(
                    project_id = %self.target.project_id,
                    kind = %self.target.kind,
                    scope = %self.target.scope.key(),
                    "Bulk delete confirmed"
                );
                Ok(&self.target)
            }
            ConfirmationStage::Executed => Err(Error::AlreadyExecuted),
            _ => Err(Error::NotConfirmed {
                confirmations: self.confirmations(),
            }),
        }
    }
}
