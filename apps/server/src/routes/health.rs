// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Liveness and session status.

use crate::AppState;
use axum::{extract::State, Json};
use bimsync_engine::Command;
use serde::Serialize;

/// Session counters, absent while a command holds the session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub converted_elements: usize,
    pub cached_materials: usize,
    pub cached_library_parts: usize,
    pub cached_classification_items: usize,
    pub cached_property_configurations: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub session: Option<SessionStatus>,
}

/// GET /api/v1/health
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    // Never wait on a running batch here.
    let session = state.session.try_lock().ok().map(|session| {
        let caches = session.caches();
        SessionStatus {
            converted_elements: session.identity().len(),
            cached_materials: caches.materials.len(),
            cached_library_parts: caches.library_parts.len(),
            cached_classification_items: caches.classifications.len(),
            cached_property_configurations: caches.properties.len(),
        }
    });
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        session,
    })
}

/// Accepted command names.
#[derive(Debug, Serialize)]
pub struct CommandList {
    pub version: &'static str,
    pub endpoint: &'static str,
    pub commands: Vec<String>,
}

/// GET /
pub async fn info() -> Json<CommandList> {
    Json(CommandList {
        version: env!("CARGO_PKG_VERSION"),
        endpoint: "/api/v1/command",
        commands: Command::names(),
    })
}
