//! Response bodies of the HTTP status surface.

use serde::Serialize;

use crate::tracker::SessionView;

/// `GET /`
#[derive(Debug, Serialize)]
pub struct Landing {
    pub status: &'static str,
    pub service: &'static str,
    pub message: &'static str,
    pub ready: bool,
    pub active_sessions: usize,
    pub uptime_seconds: u64,
}

/// `GET /health`
#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub ready: bool,
    pub active_sessions: usize,
    pub uptime_seconds: u64,
    /// Unix milliseconds.
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
    Online,
    Starting,
}

impl BotStatus {
    pub fn from_ready(ready: bool) -> Self {
        if ready { Self::Online } else { Self::Starting }
    }
}

/// `GET /status`
#[derive(Debug, Serialize)]
pub struct Status {
    pub bot_status: BotStatus,
    pub ready: bool,
    pub active_sessions: usize,
    pub sessions: Vec<SessionView>,
    pub uptime_seconds: u64,
    /// Unix milliseconds of the last `/health` poll.
    pub last_health_check: u64,
}

/// `GET /ping`
#[derive(Debug, Serialize)]
pub struct Pong {
    pub ping: &'static str,
    pub timestamp: u64,
}
