// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command endpoint.

use crate::error::ApiError;
use crate::AppState;
use axum::{extract::State, Json};
use bimsync_engine::{execute, CommandRequest};
use serde_json::Value;

/// POST /api/v1/command - Execute one command against the shared session.
///
/// Commands run one at a time; the session is locked for the whole call.
pub async fn run_command(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<Value>, ApiError> {
    tracing::debug!(command = %request.command_name, "Command received");

    let session = state.session.clone();
    let response = tokio::task::spawn_blocking(move || {
        let mut session = session
            .lock()
            .map_err(|_| ApiError::Internal("session lock poisoned".into()))?;
        execute(&mut *session, &request).map_err(ApiError::from)
    })
    .await??;

    Ok(Json(response))
}
