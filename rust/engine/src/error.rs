// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the synchronization engine.
//!
//! Only [`SyncError`] ever escapes a batch call. [`HostError`] and
//! [`BuildError`] are caught at the item boundary and turned into a
//! `Failed` result.

use bimsync_core::{ElementType, InternalId};
use thiserror::Error;

/// Result type alias for host primitives.
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Failures reported by the host model store.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("element {0} not found")]
    ElementNotFound(InternalId),

    #[error("element {guid} is a {actual}, expected {expected}")]
    TypeMismatch {
        guid: InternalId,
        expected: ElementType,
        actual: ElementType,
    },

    #[error("{kind} '{name}' not found")]
    ResourceNotFound { kind: &'static str, name: String },

    #[error("no open transaction")]
    NoTransaction,

    #[error("cannot enter editing context: {0}")]
    Context(String),

    #[error("host rejected the operation: {0}")]
    Rejected(String),

    #[error("geometry error: {0}")]
    Geometry(#[from] bimsync_geometry::Error),
}

/// Failures while turning a descriptor into a host element value.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("parent '{0}' is not a converted element")]
    UnresolvedParent(String),

    #[error("{element_type} requires a parent element")]
    ParentRequired { element_type: ElementType },

    #[error("existing element is a {existing}, cannot update it as a {requested}")]
    TypeChanged {
        existing: ElementType,
        requested: ElementType,
    },

    #[error("no builder registered for {0}")]
    NoBuilder(ElementType),

    #[error(transparent)]
    Descriptor(#[from] bimsync_core::Error),

    #[error("invalid shape: {0}")]
    Geometry(#[from] bimsync_geometry::Error),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Result type alias for builders.
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Batch-level failure; nothing was processed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to open transaction '{name}': {source}")]
    Transaction {
        name: String,
        #[source]
        source: HostError,
    },
}

/// Errors returned by the command dispatcher.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
