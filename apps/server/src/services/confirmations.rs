// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pending bulk deletes waiting for their confirmations.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use site_progress_core::{BulkDeleteConfirmation, BulkDeleteTarget, ConfirmationStage};
use uuid::Uuid;

use crate::error::ApiError;

struct Pending {
    confirmation: BulkDeleteConfirmation,
    created: Instant,
}

/// What a confirmation call led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// More confirmations are needed.
    Waiting { confirmations: u8 },
    /// Fully confirmed; the token is spent and the delete must run now.
    Execute(BulkDeleteTarget),
}

/// Token → confirmation map. Tokens expire after the configured TTL.
pub struct PendingDeletes {
    pending: Mutex<FxHashMap<Uuid, Pending>>,
    ttl: Duration,
}

impl PendingDeletes {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Mutex::new(FxHashMap::default()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<Uuid, Pending>> {
        // The map holds no invariant a panicking holder could break
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn purge_expired(&self, pending: &mut FxHashMap<Uuid, Pending>, now: Instant) {
        let ttl = self.ttl;
        pending.retain(|_, p| now.duration_since(p.created) < ttl);
    }

    /// Register a bulk delete and hand out its token.
    pub fn request(&self, target: BulkDeleteTarget) -> Uuid {
        let now = Instant::now();
        let token = Uuid::new_v4();
        let mut pending = self.lock();
        self.purge_expired(&mut pending, now);

        tracing::info!(
            token = %token,
            project_id = %target.project_id,
            kind = %target.kind,
            scope = %target.scope.key(),
            pending = pending.len() + 1,
            "Bulk delete requested"
        );
        pending.insert(
            token,
            Pending {
                confirmation: BulkDeleteConfirmation::new(target),
                created: now,
            },
        );
        token
    }

    /// Confirm once. The second confirmation removes the token and returns
    /// the target to delete.
    pub fn confirm(&self, token: Uuid) -> Result<ConfirmOutcome, ApiError> {
        let mut pending = self.lock();
        self.purge_expired(&mut pending, Instant::now());

        let entry = pending
            .get_mut(&token)
            .ok_or_else(|| ApiError::ConfirmationNotFound(token.to_string()))?;

        match entry.confirmation.confirm()? {
            ConfirmationStage::Confirmed => {
                let mut spent = pending
                    .remove(&token)
                    .ok_or_else(|| ApiError::ConfirmationNotFound(token.to_string()))?;
                let target = spent.confirmation.execute()?.clone();
                tracing::info!(token = %token, "Bulk delete confirmed");
                Ok(ConfirmOutcome::Execute(target))
            }
            _ => Ok(ConfirmOutcome::Waiting {
                confirmations: entry.confirmation.confirmations(),
            }),
        }
    }

    /// Withdraw a request before it executes. Returns whether it existed.
    pub fn cancel(&self, token: Uuid) -> bool {
        self.lock().remove(&token).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_progress_core::{DateScope, RecordKind};

    fn target() -> BulkDeleteTarget {
        BulkDeleteTarget {
            project_id: "p1".to_string(),
            kind: RecordKind::Installation,
            scope: DateScope::parse("2024-05").unwrap(),
        }
    }

    #[test]
    fn second_confirmation_executes_once() {
        let deletes = PendingDeletes::new(Duration::from_secs(60));
        let token = deletes.request(target());

        assert_eq!(
            deletes.confirm(token).unwrap(),
            ConfirmOutcome::Waiting { confirmations: 1 }
        );
        assert_eq!(deletes.confirm(token).unwrap(), ConfirmOutcome::Execute(target()));
        assert!(matches!(
            deletes.confirm(token),
            Err(ApiError::ConfirmationNotFound(_))
        ));
    }

    #[test]
    fn expired_tokens_are_gone() {
        let deletes = PendingDeletes::new(Duration::ZERO);
        let token = deletes.request(target());
        assert!(matches!(
            deletes.confirm(token),
            Err(ApiError::ConfirmationNotFound(_))
        ));
        assert!(!deletes.cancel(token));
    }

    #[test]
    fn cancelled_request_cannot_be_confirmed() {
        let deletes = PendingDeletes::new(Duration::from_secs(60));
        let token = deletes.request(target());
        assert!(deletes.cancel(token));
        assert!(!deletes.cancel(token));
        assert!(deletes.confirm(token).is_err());
    }
}
