use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Instant,
};

use crate::{
    common::types::SharedRw,
    server::now_ms,
    tracker::{RegistrySnapshot, SessionRegistry},
};

/// Read-only aggregates for the HTTP status routes.
///
/// The active-session count is read from the registry on every call, so it
/// can never drift from it.
pub struct StatusReporter {
    registry: SharedRw<SessionRegistry>,
    ready: AtomicBool,
    started_at: Instant,
    last_health_check_ms: AtomicU64,
}

impl StatusReporter {
    pub fn new(registry: SharedRw<SessionRegistry>) -> Self {
        Self {
            registry,
            ready: AtomicBool::new(false),
            started_at: Instant::now(),
            last_health_check_ms: AtomicU64::new(now_ms()),
        }
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn active_sessions(&self) -> usize {
        self.registry.read().len()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Records that an uptime monitor just polled `/health`.
    pub fn touch_health_check(&self) {
        self.last_health_check_ms.store(now_ms(), Ordering::Relaxed);
    }

    /// Unix milliseconds of the last `/health` poll (process start if none).
    pub fn last_health_check(&self) -> u64 {
        self.last_health_check_ms.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.registry.read().snapshot(Instant::now())
    }
}
