// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server-side services behind the routes.

pub mod classification;
pub mod confirmations;

pub use confirmations::{ConfirmOutcome, PendingDeletes};
