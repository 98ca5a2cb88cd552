// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while encoding or decoding shapes
#[derive(Error, Debug)]
pub enum Error {
    #[error("Polyline {index} has no segments")]
    EmptyPolyline { index: usize },

    #[error("Invalid polygon encoding: {0}")]
    InvalidEncoding(String),

    #[error("Vertex index {index} out of range (vertex count {count})")]
    VertexOutOfRange { index: u32, count: usize },

    #[error("Memo has no polygon in slot {0}")]
    MissingSlot(String),

    #[error("Invalid model geometry: {0}")]
    InvalidModel(String),
}
