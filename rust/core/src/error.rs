// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for descriptor and identifier handling.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading descriptors and identifiers.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown element type: {0}")]
    UnknownElementType(String),

    #[error("Invalid identifier '{value}': {reason}")]
    InvalidId { value: String, reason: String },

    #[error("Descriptor field '{key}' has an unexpected shape: {reason}")]
    FieldType { key: String, reason: String },

    #[error("Descriptor is not an object")]
    NotAnObject,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a field-shape error.
    pub fn field(key: &str, reason: impl Into<String>) -> Self {
        Error::FieldType {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
