// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! External id to host guid correlation.
//!
//! The map is owned by a [`SyncSession`](crate::SyncSession) and outlives
//! individual batches, including `finish_transaction`, so that a repeated
//! synchronization of the same document updates the elements it created
//! earlier. Only [`IdentityMap::clear`] forgets entries.

use bimsync_core::{ExternalId, InternalId};
use rustc_hash::FxHashMap;

/// Whether an external id has been converted, and into what.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionState {
    pub is_converted: bool,
    pub internal_id: Option<InternalId>,
}

#[derive(Debug, Default)]
pub struct IdentityMap {
    records: FxHashMap<ExternalId, InternalId>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an external id. Never mutates the map.
    pub fn get_state(&self, external_id: &ExternalId) -> ConversionState {
        let internal_id = self.records.get(external_id).copied();
        ConversionState {
            is_converted: internal_id.is_some(),
            internal_id,
        }
    }

    /// Insert or overwrite the mapping.
    pub fn update_state(&mut self, external_id: ExternalId, internal_id: InternalId) {
        self.records.insert(external_id, internal_id);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ExternalId, &InternalId)> {
        self.records.iter()
    }
}
