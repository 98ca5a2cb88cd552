// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types and handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bimsync_engine::{CommandError, SyncError};
use serde::Serialize;
use thiserror::Error;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Join error")]
    Join(#[from] tokio::task::JoinError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Command(CommandError::UnknownCommand(_)) => (StatusCode::NOT_FOUND, "UNKNOWN_COMMAND"),
            ApiError::Command(CommandError::InvalidParameters(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_PARAMETERS")
            }
            ApiError::Command(CommandError::Sync(SyncError::Transaction { .. })) => {
                (StatusCode::CONFLICT, "TRANSACTION_FAILED")
            }
            ApiError::Command(CommandError::Json(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "SERIALIZATION_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Join(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TASK_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, code, "Request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
