use std::sync::Arc;

use axum::{extract::State, http::Uri, response::Json};

use crate::{
    api::{BotStatus, Health, Landing, Pong, Status},
    common::ApiError,
    server::{AppState, now_ms},
};

/// GET /
pub async fn landing(State(state): State<Arc<AppState>>) -> Json<Landing> {
    let status = &state.status;
    Json(Landing {
        status: "ok",
        service: "Inside Curl",
        message: "Voice session tracker is running",
        ready: status.is_ready(),
        active_sessions: status.active_sessions(),
        uptime_seconds: status.uptime_seconds(),
    })
}

/// GET /health
///
/// Always 200 so uptime monitors keep the host awake while the bot connects.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    let status = &state.status;
    status.touch_health_check();
    Json(Health {
        status: "healthy",
        ready: status.is_ready(),
        active_sessions: status.active_sessions(),
        uptime_seconds: status.uptime_seconds(),
        timestamp: now_ms(),
    })
}

/// GET /status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<Status> {
    tracing::debug!("GET /status");
    let status = &state.status;
    let snapshot = status.snapshot();
    let ready = status.is_ready();
    Json(Status {
        bot_status: BotStatus::from_ready(ready),
        ready,
        active_sessions: snapshot.count,
        sessions: snapshot.sessions,
        uptime_seconds: status.uptime_seconds(),
        last_health_check: status.last_health_check(),
    })
}

/// GET /ping
pub async fn ping() -> Json<Pong> {
    Json(Pong {
        ping: "pong",
        timestamp: now_ms(),
    })
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()), uri.path())
}
