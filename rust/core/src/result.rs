// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-item synchronization results.

use crate::ids::{ExternalId, InternalId};
use serde::{Deserialize, Serialize};

/// Outcome of synchronizing one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncStatus {
    Created,
    Updated,
    Failed,
}

impl SyncStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, SyncStatus::Failed)
    }
}

/// Result record for one processed descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynchronizationResult {
    pub original_id: ExternalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<InternalId>,
    #[serde(default)]
    pub created_ids: Vec<InternalId>,
    pub status: SyncStatus,
    #[serde(default)]
    pub log: Vec<String>,
}

impl SynchronizationResult {
    pub fn created(original_id: ExternalId, id: InternalId, log: Vec<String>) -> Self {
        Self {
            original_id,
            application_id: Some(id),
            created_ids: vec![id],
            status: SyncStatus::Created,
            log,
        }
    }

    pub fn updated(original_id: ExternalId, id: InternalId, log: Vec<String>) -> Self {
        Self {
            original_id,
            application_id: Some(id),
            created_ids: vec![id],
            status: SyncStatus::Updated,
            log,
        }
    }

    /// A failed item always carries at least one log line.
    pub fn failed(original_id: ExternalId, mut log: Vec<String>, reason: impl Into<String>) -> Self {
        log.push(reason.into());
        Self {
            original_id,
            application_id: None,
            created_ids: Vec::new(),
            status: SyncStatus::Failed,
            log,
        }
    }
}
