// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BIMSync Server - command transport for the synchronization engine.
//!
//! One long-lived session per process. The identity map survives across
//! commands; `FinishReceiveTransaction` empties the resource caches.
//!
//! # Endpoints
//!
//! - `GET /` - Accepted command names
//! - `GET /api/v1/health` - Liveness and session counters
//! - `POST /api/v1/command` - `{ commandName, parameters }`

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use bimsync_engine::{MemoryHost, SyncSession};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod routes;

use config::{Config, LogFormat};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<SyncSession<MemoryHost>>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let session = SyncSession::with_options(MemoryHost::new(), config.session_options());
        Self {
            session: Arc::new(Mutex::new(session)),
            config: Arc::new(config),
        }
    }
}

/// Build the router with every route and middleware layer.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();
    Router::new()
        .route("/", get(routes::health::info))
        .route("/api/v1/health", get(routes::health::check))
        .route("/api/v1/command", post(routes::command::run_command))
        .layer(DefaultBodyLimit::max(config.max_body_mb * 1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,bimsync_engine=debug,bimsync_server=debug"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).pretty().init(),
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = Config::from_env();
    init_tracing(config.log_format);

    tracing::info!(
        port = config.port,
        max_body_mb = config.max_body_mb,
        request_timeout_secs = config.request_timeout_secs,
        send_properties = config.send_properties,
        "Starting BIMSync Server"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = app(AppState::new(config));

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
