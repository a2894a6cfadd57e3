use std::{sync::Arc, time::Instant};

use tracing::{debug, error, info, warn};

use crate::{
    common::types::{ChannelId, SharedRw},
    tracker::{
        duration::format_duration,
        events::{Command, GatewayEvent, InteractionHandle, Member, Notify, Outbound},
        messages,
        notifier::Notifier,
        registry::SessionRegistry,
    },
};

/// Turns gateway events into registry transitions and log messages.
///
/// Each event is handled in two phases: the registry transition commits
/// under the write lock, then the resulting message (if any) is delivered
/// with the lock released. Delivery failures are logged and dropped.
pub struct EventRouter {
    registry: SharedRw<SessionRegistry>,
    notifier: Arc<dyn Notifier>,
    log_channel: ChannelId,
}

impl EventRouter {
    pub fn new(
        registry: SharedRw<SessionRegistry>,
        notifier: Arc<dyn Notifier>,
        log_channel: ChannelId,
    ) -> Self {
        Self {
            registry,
            notifier,
            log_channel,
        }
    }

    /// Applies `event` as of `now` and delivers the resulting message.
    pub async fn dispatch(&self, event: GatewayEvent) {
        if let Some(outbound) = self.apply(&event, Instant::now()) {
            self.deliver(outbound).await;
        }
    }

    /// Commits the registry transition for `event` and returns the message
    /// to send, if any. Never performs I/O.
    pub fn apply(&self, event: &GatewayEvent, now: Instant) -> Option<Outbound> {
        match event {
            GatewayEvent::Ready { occupants, .. } => {
                let mut registry = self.registry.write();
                let mut seeded = 0usize;
                for occupant in occupants.iter().filter(|o| !o.member.is_bot) {
                    if registry.backfill(occupant.member.id, occupant.channel_name.as_str(), now)
                    {
                        debug!(
                            "Backfilled {} in {}",
                            occupant.member.display_name, occupant.channel_name
                        );
                        seeded += 1;
                    }
                }
                if seeded == 0 {
                    info!("Ready: nobody new in voice ({} tracked)", registry.len());
                } else {
                    info!("Ready: tracking {} member(s) already in voice", seeded);
                }
                None
            }
            GatewayEvent::VoiceStateChanged {
                member,
                before,
                after,
            } => {
                if member.is_bot {
                    return None;
                }
                self.apply_voice(member, before.as_deref(), after.as_deref(), now)
            }
            GatewayEvent::CommandInvoked {
                member,
                interaction,
                command,
            } => {
                if member.is_bot {
                    return None;
                }
                self.apply_command(member, interaction, command)
            }
        }
    }

    fn apply_voice(
        &self,
        member: &Member,
        before: Option<&str>,
        after: Option<&str>,
        now: Instant,
    ) -> Option<Outbound> {
        match (before, after) {
            (None, Some(channel)) => {
                let replaced = self.registry.write().start(member.id, channel, now);
                if replaced {
                    warn!(
                        "{} ({}) joined {} while a session was still open; restarting it",
                        member.display_name, member.id, channel
                    );
                }
                info!("{} joined {}", member.display_name, channel);
                Some(Outbound::LogMessage {
                    text: messages::joined(&member.display_name, channel),
                    notify: Notify::Loud,
                })
            }
            (Some(channel), None) => {
                let Some(closed) = self.registry.write().end(member.id, now) else {
                    debug!(
                        "{} left {} without a tracked session",
                        member.display_name, channel
                    );
                    return None;
                };
                info!(
                    "{} left {} ({})",
                    member.display_name,
                    closed.channel_name,
                    format_duration(closed.elapsed_secs())
                );
                Some(Outbound::LogMessage {
                    text: messages::left(&member.display_name, &closed),
                    notify: Notify::Silent,
                })
            }
            (Some(from), Some(to)) if from != to => {
                let tracked = self.registry.write().move_to(member.id, to);
                debug!(
                    "{}: {} -> {}{}",
                    member.display_name,
                    from,
                    to,
                    if tracked { "" } else { " (untracked)" }
                );
                None
            }
            _ => None,
        }
    }

    fn apply_command(
        &self,
        member: &Member,
        interaction: &InteractionHandle,
        command: &Command,
    ) -> Option<Outbound> {
        match command {
            Command::SetTopic { topic } if topic.trim().is_empty() => {
                debug!("{} sent a blank topic", member.display_name);
                Some(Outbound::EphemeralReply {
                    interaction: interaction.clone(),
                    text: messages::topic_blank(),
                })
            }
            Command::SetTopic { topic } => {
                let channel = {
                    let mut registry = self.registry.write();
                    if registry.set_topic(member.id, topic.as_str()) {
                        registry.channel_of(member.id).map(str::to_owned)
                    } else {
                        None
                    }
                };

                let text = match channel {
                    Some(channel) => {
                        info!("{} set topic: {}", member.display_name, topic);
                        messages::topic_set(topic, &channel)
                    }
                    None => {
                        debug!(
                            "{} tried to set a topic outside voice",
                            member.display_name
                        );
                        messages::topic_needs_voice()
                    }
                };

                Some(Outbound::EphemeralReply {
                    interaction: interaction.clone(),
                    text,
                })
            }
            Command::Unknown { name } => {
                warn!("{} invoked unknown command /{}", member.display_name, name);
                Some(Outbound::EphemeralReply {
                    interaction: interaction.clone(),
                    text: messages::unknown_command(name),
                })
            }
        }
    }

    async fn deliver(&self, outbound: Outbound) {
        let result = match &outbound {
            Outbound::LogMessage { text, notify } => {
                self.notifier
                    .send_message(self.log_channel, text, *notify)
                    .await
            }
            Outbound::EphemeralReply { interaction, text } => {
                self.notifier.reply_ephemeral(interaction, text).await
            }
        };

        if let Err(e) = result {
            error!(
                "Failed to deliver message ({:?}) to {}: {}",
                outbound.text(),
                self.destination(&outbound),
                e
            );
        }
    }

    /// Where `outbound` goes, for log lines.
    fn destination(&self, outbound: &Outbound) -> String {
        match outbound {
            Outbound::LogMessage { .. } => format!("channel {}", self.log_channel),
            Outbound::EphemeralReply { interaction, .. } => {
                format!("interaction {}", interaction.id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::{Mutex, RwLock};

    use super::*;
    use crate::{
        common::types::{AnyResult, UserId},
        tracker::events::VoiceOccupant,
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Sent {
        Message(ChannelId, String, Notify),
        Reply(String, String),
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Sent>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_message(
            &self,
            channel_id: ChannelId,
            text: &str,
            notify: Notify,
        ) -> AnyResult<()> {
            if self.fail {
                return Err("missing access".into());
            }
            self.sent
                .lock()
                .push(Sent::Message(channel_id, text.to_string(), notify));
            Ok(())
        }

        async fn reply_ephemeral(
            &self,
            interaction: &InteractionHandle,
            text: &str,
        ) -> AnyResult<()> {
            if self.fail {
                return Err("unknown interaction".into());
            }
            self.sent
                .lock()
                .push(Sent::Reply(interaction.id.clone(), text.to_string()));
            Ok(())
        }
    }

    const LOG: ChannelId = ChannelId(900);

    fn setup(fail: bool) -> (EventRouter, SharedRw<SessionRegistry>, Arc<RecordingNotifier>) {
        let registry = Arc::new(RwLock::new(SessionRegistry::new()));
        let notifier = Arc::new(RecordingNotifier {
            fail,
            ..Default::default()
        });
        let router = EventRouter::new(registry.clone(), notifier.clone(), LOG);
        (router, registry, notifier)
    }

    fn human(id: u64) -> Member {
        Member {
            id: UserId(id),
            is_bot: false,
            display_name: format!("user{}", id),
        }
    }

    fn bot(id: u64) -> Member {
        Member {
            is_bot: true,
            ..human(id)
        }
    }

    fn voice(member: Member, before: Option<&str>, after: Option<&str>) -> GatewayEvent {
        GatewayEvent::VoiceStateChanged {
            member,
            before: before.map(String::from),
            after: after.map(String::from),
        }
    }

    fn set_topic(member: Member, topic: &str) -> GatewayEvent {
        GatewayEvent::CommandInvoked {
            member,
            interaction: InteractionHandle {
                id: "int-1".into(),
                token: "tok".into(),
            },
            command: Command::SetTopic {
                topic: topic.into(),
            },
        }
    }

    fn at(t0: Instant, secs: u64) -> Instant {
        t0 + Duration::from_secs(secs)
    }

    #[test]
    fn topic_session_reports_topic_and_duration() {
        let (router, _, _) = setup(false);
        let t0 = Instant::now();

        let joined = router.apply(&voice(human(1), None, Some("Lounge")), t0);
        assert!(matches!(
            joined,
            Some(Outbound::LogMessage { notify: Notify::Loud, ref text }) if text.contains("Lounge")
        ));

        let reply = router.apply(&set_topic(human(1), "Calculus"), at(t0, 10));
        let Some(Outbound::EphemeralReply { text, .. }) = reply else {
            panic!("expected an ephemeral reply, got {:?}", reply);
        };
        assert!(text.contains("Calculus"));
        assert!(text.contains("Lounge"));

        let left = router
            .apply(&voice(human(1), Some("Lounge"), None), at(t0, 3661))
            .expect("leave should produce a message");
        assert!(left.text().contains("Calculus"));
        assert!(left.text().contains("1h1m1s"));
        assert!(matches!(left, Outbound::LogMessage { notify: Notify::Silent, .. }));
    }

    #[test]
    fn short_session_without_topic_uses_solo_phrasing() {
        let (router, _, _) = setup(false);
        let t0 = Instant::now();

        router.apply(&voice(human(1), None, Some("Lounge")), t0);
        let left = router
            .apply(&voice(human(1), Some("Lounge"), None), at(t0, 5))
            .unwrap();

        assert!(left.text().contains("levelling up solo"));
        assert!(left.text().contains("5s"));
    }

    #[test]
    fn move_is_silent_and_keeps_original_join_time() {
        let (router, registry, _) = setup(false);
        let t0 = Instant::now();

        router.apply(&voice(human(1), None, Some("Lounge")), t0);
        let moved = router.apply(&voice(human(1), Some("Lounge"), Some("Study")), at(t0, 600));
        assert_eq!(moved, None);
        assert_eq!(registry.read().channel_of(UserId(1)), Some("Study"));

        let left = router
            .apply(&voice(human(1), Some("Study"), None), at(t0, 660))
            .unwrap();
        assert!(left.text().contains("11m"));
        assert!(left.text().contains("Study"));
    }

    #[test]
    fn same_channel_update_is_ignored() {
        let (router, registry, _) = setup(false);
        let t0 = Instant::now();
        router.apply(&voice(human(1), None, Some("Lounge")), t0);

        let out = router.apply(&voice(human(1), Some("Lounge"), Some("Lounge")), at(t0, 3));
        assert_eq!(out, None);
        assert_eq!(registry.read().len(), 1);
    }

    #[test]
    fn leave_without_session_is_suppressed() {
        let (router, registry, _) = setup(false);
        let out = router.apply(&voice(human(5), Some("Lounge"), None), Instant::now());
        assert_eq!(out, None);
        assert!(registry.read().is_empty());
    }

    #[test]
    fn topic_outside_voice_warns() {
        let (router, registry, _) = setup(false);
        let out = router.apply(&set_topic(human(3), "Physics"), Instant::now());
        let Some(Outbound::EphemeralReply { text, .. }) = out else {
            panic!("expected a warning reply");
        };
        assert!(text.contains("Join one first"));
        assert!(registry.read().is_empty());
    }

    #[test]
    fn blank_topic_gets_a_hint_and_keeps_the_old_topic() {
        let (router, registry, _) = setup(false);
        let t0 = Instant::now();
        router.apply(&voice(human(3), None, Some("Lounge")), t0);
        router.apply(&set_topic(human(3), "Physics"), at(t0, 1));

        let out = router.apply(&set_topic(human(3), ""), at(t0, 2));
        let Some(Outbound::EphemeralReply { text, .. }) = out else {
            panic!("expected a hint reply");
        };
        assert!(text.contains("can't be empty"));
        let snap = registry.read().snapshot(at(t0, 3));
        assert_eq!(snap.sessions[0].topic.as_deref(), Some("Physics"));
    }

    #[test]
    fn unknown_command_is_answered() {
        let (router, registry, _) = setup(false);
        let event = GatewayEvent::CommandInvoked {
            member: human(4),
            interaction: InteractionHandle {
                id: "int-9".into(),
                token: "tok".into(),
            },
            command: Command::Unknown {
                name: "study".into(),
            },
        };

        let Some(Outbound::EphemeralReply { interaction, text }) =
            router.apply(&event, Instant::now())
        else {
            panic!("expected a reply");
        };
        assert_eq!(interaction.id, "int-9");
        assert!(text.contains("/study"));
        assert!(registry.read().is_empty());
    }

    #[test]
    fn failed_reply_is_reported_against_the_interaction() {
        let (router, _, _) = setup(false);
        let reply = Outbound::EphemeralReply {
            interaction: InteractionHandle {
                id: "int-5".into(),
                token: "tok".into(),
            },
            text: "hi".into(),
        };
        let log = Outbound::LogMessage {
            text: "hi".into(),
            notify: Notify::Loud,
        };

        assert_eq!(router.destination(&reply), "interaction int-5");
        assert_eq!(router.destination(&log), format!("channel {}", LOG));
    }

    #[test]
    fn bots_never_touch_the_registry() {
        let (router, registry, _) = setup(false);
        let t0 = Instant::now();

        router.apply(&voice(human(1), None, Some("Lounge")), t0);
        let snapshot_before = registry.read().snapshot(t0);

        let events = [
            voice(bot(1), None, Some("Study")),
            voice(bot(1), Some("Lounge"), Some("Study")),
            voice(bot(1), Some("Lounge"), None),
            voice(bot(2), None, Some("Lounge")),
            set_topic(bot(1), "Hijack"),
            GatewayEvent::Ready {
                application_id: None,
                occupants: vec![VoiceOccupant {
                    member: bot(3),
                    channel_name: "Lounge".into(),
                }],
            },
        ];
        for event in &events {
            assert_eq!(router.apply(event, at(t0, 1)), None);
        }

        assert_eq!(registry.read().snapshot(t0), snapshot_before);
    }

    #[test]
    fn ready_backfills_silently_without_overwriting() {
        let (router, registry, _) = setup(false);
        let t0 = Instant::now();
        router.apply(&voice(human(1), None, Some("Lounge")), t0);
        router.apply(&set_topic(human(1), "Calculus"), t0);

        let ready = GatewayEvent::Ready {
            application_id: None,
            occupants: vec![
                VoiceOccupant {
                    member: human(1),
                    channel_name: "Study".into(),
                },
                VoiceOccupant {
                    member: human(2),
                    channel_name: "Study".into(),
                },
            ],
        };
        assert_eq!(router.apply(&ready, at(t0, 50)), None);

        let snap = registry.read().snapshot(at(t0, 60));
        assert_eq!(snap.count, 2);
        assert_eq!(snap.sessions[0].channel_name, "Lounge");
        assert_eq!(snap.sessions[0].topic.as_deref(), Some("Calculus"));
        assert_eq!(snap.sessions[0].elapsed_seconds, 60);
        assert_eq!(snap.sessions[1].elapsed_seconds, 10);
    }

    #[test]
    fn rejoin_with_open_session_restarts_clock() {
        let (router, registry, _) = setup(false);
        let t0 = Instant::now();
        router.apply(&voice(human(1), None, Some("Lounge")), t0);

        let again = router.apply(&voice(human(1), None, Some("Study")), at(t0, 100));
        assert!(again.is_some());
        assert_eq!(registry.read().len(), 1);

        let left = router
            .apply(&voice(human(1), Some("Study"), None), at(t0, 130))
            .unwrap();
        assert!(left.text().contains("30s"));
    }

    #[tokio::test]
    async fn dispatch_delivers_to_log_channel_and_invoker() {
        let (router, _, notifier) = setup(false);

        router.dispatch(voice(human(1), None, Some("Lounge"))).await;
        router.dispatch(set_topic(human(1), "Calculus")).await;
        router.dispatch(voice(human(1), Some("Lounge"), None)).await;

        let sent = notifier.sent.lock().clone();
        assert_eq!(sent.len(), 3);
        assert!(matches!(&sent[0], Sent::Message(LOG, _, Notify::Loud)));
        assert!(matches!(&sent[1], Sent::Reply(id, text) if id == "int-1" && text.contains("Calculus")));
        assert!(matches!(&sent[2], Sent::Message(LOG, text, Notify::Silent) if text.contains("Calculus")));
    }

    #[tokio::test]
    async fn move_sends_nothing() {
        let (router, _, notifier) = setup(false);
        router.dispatch(voice(human(1), None, Some("Lounge"))).await;
        router
            .dispatch(voice(human(1), Some("Lounge"), Some("Study")))
            .await;
        assert_eq!(notifier.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn delivery_failure_keeps_the_transition() {
        let (router, registry, notifier) = setup(true);

        router.dispatch(voice(human(1), None, Some("Lounge"))).await;
        assert!(registry.read().contains(UserId(1)));

        router.dispatch(voice(human(1), Some("Lounge"), None)).await;
        assert!(!registry.read().contains(UserId(1)));
        assert!(notifier.sent.lock().is_empty());
    }
}
