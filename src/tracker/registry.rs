use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use serde::Serialize;

use crate::common::types::UserId;

/// An open voice session.
#[derive(Debug, Clone)]
pub struct VoiceSession {
    join_time: Instant,
    topic: Option<String>,
    channel_name: String,
}

impl VoiceSession {
    fn new(channel_name: String, join_time: Instant) -> Self {
        Self {
            join_time,
            topic: None,
            channel_name,
        }
    }

    fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.join_time)
    }
}

/// A session removed by [`SessionRegistry::end`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSession {
    pub user_id: UserId,
    pub channel_name: String,
    pub topic: Option<String>,
    pub duration: Duration,
}

impl ClosedSession {
    pub fn elapsed_secs(&self) -> u64 {
        self.duration.as_secs()
    }
}

/// Read-only copy of one session, for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub user_id: UserId,
    pub channel_name: String,
    pub topic: Option<String>,
    pub elapsed_seconds: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    pub count: usize,
    pub sessions: Vec<SessionView>,
}

/// Who is in voice right now, keyed by user.
///
/// Every operation is total: a missing user is reported through the return
/// value, never as an error.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<UserId, VoiceSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session with a fresh clock and no topic.
    ///
    /// Returns `true` when an open session for the same user was replaced.
    pub fn start(&mut self, user_id: UserId, channel_name: impl Into<String>, at: Instant) -> bool {
        self.sessions
            .insert(user_id, VoiceSession::new(channel_name.into(), at))
            .is_some()
    }

    /// Removes the session and reports how long it lasted.
    pub fn end(&mut self, user_id: UserId, at: Instant) -> Option<ClosedSession> {
        let session = self.sessions.remove(&user_id)?;
        Some(ClosedSession {
            user_id,
            duration: session.elapsed(at),
            channel_name: session.channel_name,
            topic: session.topic,
        })
    }

    /// Updates the channel label only; the clock and topic carry over.
    pub fn move_to(&mut self, user_id: UserId, channel_name: impl Into<String>) -> bool {
        match self.sessions.get_mut(&user_id) {
            Some(session) => {
                session.channel_name = channel_name.into();
                true
            }
            None => false,
        }
    }

    /// Sets the topic, replacing any earlier one.
    pub fn set_topic(&mut self, user_id: UserId, topic: impl Into<String>) -> bool {
        match self.sessions.get_mut(&user_id) {
            Some(session) => {
                session.topic = Some(topic.into());
                true
            }
            None => false,
        }
    }

    /// Seeds a session for someone already in voice. Never overwrites.
    pub fn backfill(
        &mut self,
        user_id: UserId,
        channel_name: impl Into<String>,
        at: Instant,
    ) -> bool {
        if self.sessions.contains_key(&user_id) {
            return false;
        }
        self.sessions
            .insert(user_id, VoiceSession::new(channel_name.into(), at));
        true
    }

    /// Channel name of the open session, if any.
    pub fn channel_of(&self, user_id: UserId) -> Option<&str> {
        self.sessions
            .get(&user_id)
            .map(|s| s.channel_name.as_str())
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.sessions.contains_key(&user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Owned copies of every session, ordered by user id.
    pub fn snapshot(&self, now: Instant) -> RegistrySnapshot {
        let mut sessions: Vec<SessionView> = self
            .sessions
            .iter()
            .map(|(user_id, s)| SessionView {
                user_id: *user_id,
                channel_name: s.channel_name.clone(),
                topic: s.topic.clone(),
                elapsed_seconds: s.elapsed(now).as_secs(),
            })
            .collect();
        sessions.sort_by_key(|v| v.user_id);

        RegistrySnapshot {
            count: sessions.len(),
            sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn end_removes_and_second_end_is_not_found() {
        let t0 = Instant::now();
        let mut registry = SessionRegistry::new();

        assert!(!registry.start(ALICE, "Lounge", t0));
        let closed = registry.end(ALICE, t0 + secs(42)).expect("session should exist");
        assert_eq!(closed.elapsed_secs(), 42);
        assert_eq!(closed.channel_name, "Lounge");
        assert_eq!(closed.topic, None);

        assert!(!registry.contains(ALICE));
        assert!(registry.snapshot(t0).sessions.iter().all(|v| v.user_id != ALICE));
        assert_eq!(registry.end(ALICE, t0 + secs(43)), None);
    }

    #[test]
    fn repeated_start_end_cycles_leave_no_residue() {
        let t0 = Instant::now();
        let mut registry = SessionRegistry::new();

        for round in 0..5u64 {
            registry.start(ALICE, "Lounge", t0 + secs(round * 10));
            assert_eq!(registry.len(), 1);
            assert!(registry.end(ALICE, t0 + secs(round * 10 + 3)).is_some());
            assert!(registry.is_empty());
            assert!(registry.end(ALICE, t0 + secs(round * 10 + 4)).is_none());
        }
    }

    #[test]
    fn move_keeps_clock_and_topic() {
        let t0 = Instant::now();
        let now = t0 + secs(90);
        let mut registry = SessionRegistry::new();
        registry.start(ALICE, "Lounge", t0);
        registry.set_topic(ALICE, "Calculus");

        let before = registry.snapshot(now).sessions[0].elapsed_seconds;
        assert!(registry.move_to(ALICE, "Study"));
        let after = registry.snapshot(now).sessions[0].clone();

        assert_eq!(before, after.elapsed_seconds);
        assert_eq!(after.channel_name, "Study");
        assert_eq!(after.topic.as_deref(), Some("Calculus"));
    }

    #[test]
    fn move_and_topic_on_absent_user_report_not_found() {
        let mut registry = SessionRegistry::new();
        assert!(!registry.move_to(BOB, "Study"));
        assert!(!registry.set_topic(BOB, "Physics"));
        assert!(registry.is_empty());
    }

    #[test]
    fn last_topic_wins() {
        let t0 = Instant::now();
        let mut registry = SessionRegistry::new();
        registry.start(ALICE, "Lounge", t0);
        registry.set_topic(ALICE, "Algebra");
        registry.set_topic(ALICE, "Calculus");

        let closed = registry.end(ALICE, t0 + secs(1)).unwrap();
        assert_eq!(closed.topic.as_deref(), Some("Calculus"));
    }

    #[test]
    fn topic_does_not_survive_into_next_session() {
        let t0 = Instant::now();
        let mut registry = SessionRegistry::new();
        registry.start(ALICE, "Lounge", t0);
        registry.set_topic(ALICE, "Calculus");
        registry.end(ALICE, t0 + secs(5));

        registry.start(ALICE, "Lounge", t0 + secs(10));
        let closed = registry.end(ALICE, t0 + secs(20)).unwrap();
        assert_eq!(closed.topic, None);
        assert_eq!(closed.elapsed_secs(), 10);
    }

    #[test]
    fn backfill_never_overwrites() {
        let t0 = Instant::now();
        let mut registry = SessionRegistry::new();
        registry.start(ALICE, "Lounge", t0);
        registry.set_topic(ALICE, "Calculus");

        assert!(!registry.backfill(ALICE, "Study", t0 + secs(100)));

        let view = &registry.snapshot(t0 + secs(100)).sessions[0];
        assert_eq!(view.channel_name, "Lounge");
        assert_eq!(view.topic.as_deref(), Some("Calculus"));
        assert_eq!(view.elapsed_seconds, 100);
    }

    #[test]
    fn backfill_inserts_when_absent() {
        let t0 = Instant::now();
        let mut registry = SessionRegistry::new();
        assert!(registry.backfill(BOB, "Study", t0));
        assert_eq!(registry.channel_of(BOB), Some("Study"));
    }

    #[test]
    fn start_replaces_and_signals() {
        let t0 = Instant::now();
        let mut registry = SessionRegistry::new();
        registry.start(ALICE, "Lounge", t0);
        registry.set_topic(ALICE, "Calculus");

        assert!(registry.start(ALICE, "Study", t0 + secs(30)));
        assert_eq!(registry.len(), 1);

        let closed = registry.end(ALICE, t0 + secs(40)).unwrap();
        assert_eq!(closed.channel_name, "Study");
        assert_eq!(closed.topic, None);
        assert_eq!(closed.elapsed_secs(), 10);
    }

    #[test]
    fn end_before_join_saturates_to_zero() {
        let t0 = Instant::now() + secs(60);
        let mut registry = SessionRegistry::new();
        registry.start(ALICE, "Lounge", t0);
        let closed = registry.end(ALICE, t0 - secs(5)).unwrap();
        assert_eq!(closed.elapsed_secs(), 0);
    }

    #[test]
    fn snapshot_is_sorted_and_counted() {
        let t0 = Instant::now();
        let mut registry = SessionRegistry::new();
        registry.start(BOB, "Study", t0);
        registry.start(ALICE, "Lounge", t0 + secs(5));

        let snap = registry.snapshot(t0 + secs(10));
        assert_eq!(snap.count, 2);
        assert_eq!(snap.sessions[0].user_id, ALICE);
        assert_eq!(snap.sessions[0].elapsed_seconds, 5);
        assert_eq!(snap.sessions[1].user_id, BOB);
        assert_eq!(snap.sessions[1].elapsed_seconds, 10);
    }
}
