use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    GatewayClient, ResumeInfo,
    heartbeat::{heartbeat_message, spawn_heartbeat},
};
use crate::{
    gateway::{
        constants::INTERACTION_APPLICATION_COMMAND,
        models::{Channel, GuildCreate, Interaction, Ready, VoiceState},
        session::types::{GatewayPayload, SessionOutcome, opcode},
    },
    rest::commands::{TOPIC_COMMAND, TOPIC_OPTION},
    tracker::{Command, GatewayEvent, InteractionHandle},
};

/// Per-connection state: heartbeat bookkeeping and the payload handlers.
pub struct SessionState<'a> {
    gateway: &'a GatewayClient,
    tx: tokio::sync::mpsc::UnboundedSender<Message>,
    is_resume: bool,
    zombie: CancellationToken,
    acked: Arc<AtomicBool>,
    heartbeat_handle: Option<tokio::task::JoinHandle<()>>,
}

impl<'a> SessionState<'a> {
    pub fn new(
        gateway: &'a GatewayClient,
        tx: tokio::sync::mpsc::UnboundedSender<Message>,
        is_resume: bool,
        zombie: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            tx,
            is_resume,
            zombie,
            acked: Arc::new(AtomicBool::new(true)),
            heartbeat_handle: None,
        }
    }

    pub fn handle_text(&mut self, text: &str) -> Option<SessionOutcome> {
        let msg: GatewayPayload = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(e) => {
                warn!(
                    "[{}] Failed to parse gateway message: {}",
                    self.gateway.guild_id(),
                    e
                );
                return None;
            }
        };

        if let Some(seq) = msg.s {
            self.gateway.seq.store(seq, Ordering::Relaxed);
        }

        match msg.op {
            opcode::HELLO => self.handle_hello(msg.d),
            opcode::HEARTBEAT_ACK => {
                self.acked.store(true, Ordering::Relaxed);
                None
            }
            opcode::HEARTBEAT => {
                if let Some(beat) = heartbeat_message(self.gateway.seq.load(Ordering::Relaxed)) {
                    let _ = self.tx.send(beat);
                }
                None
            }
            opcode::RECONNECT => {
                debug!("[{}] Gateway asked us to reconnect", self.gateway.guild_id());
                Some(SessionOutcome::Reconnect)
            }
            opcode::INVALID_SESSION => {
                let resumable = msg.d.as_bool().unwrap_or(false);
                info!(
                    "[{}] Session invalidated (resumable={})",
                    self.gateway.guild_id(),
                    resumable
                );
                if resumable {
                    Some(SessionOutcome::Reconnect)
                } else {
                    Some(SessionOutcome::Identify)
                }
            }
            opcode::DISPATCH => {
                let kind = msg.t.unwrap_or_default();
                self.handle_dispatch(&kind, msg.d)
            }
            _ => {
                debug!(
                    "[{}] Received gateway op {}",
                    self.gateway.guild_id(),
                    msg.op
                );
                None
            }
        }
    }

    fn handle_hello(&mut self, d: Value) -> Option<SessionOutcome> {
        let interval = d["heartbeat_interval"].as_u64().unwrap_or(41_250);
        if let Some(h) = self.heartbeat_handle.take() {
            h.abort();
        }

        debug!(
            "[{}] Heartbeat interval set to {}ms",
            self.gateway.guild_id(),
            interval
        );
        self.heartbeat_handle = Some(spawn_heartbeat(
            self.tx.clone(),
            self.gateway.seq.clone(),
            self.acked.clone(),
            self.zombie.clone(),
            interval,
        ));

        let resume = if self.is_resume {
            self.gateway.resume_message()
        } else {
            None
        };
        let msg = match resume {
            Some(msg) => msg,
            None => self.gateway.identify_message(),
        };
        self.send(&msg);
        None
    }

    fn handle_dispatch(&mut self, kind: &str, d: Value) -> Option<SessionOutcome> {
        match kind {
            "READY" => {
                let ready: Ready = self.parse(kind, d)?;
                info!(
                    "[{}] Logged in as {} ({})",
                    self.gateway.guild_id(),
                    ready.user.username,
                    ready.user.id
                );
                *self.gateway.resume.lock() = Some(ResumeInfo {
                    session_id: ready.session_id,
                    resume_url: ready.resume_gateway_url,
                });
                *self.gateway.application_id.lock() = Some(ready.application.id);
                self.gateway.cache.lock().set_self_id(ready.user.id);
                self.gateway.established.store(true, Ordering::Release);
                None
            }
            "RESUMED" => {
                info!("[{}] Gateway session resumed", self.gateway.guild_id());
                self.gateway.established.store(true, Ordering::Release);
                None
            }
            "GUILD_CREATE" => {
                let guild: GuildCreate = self.parse(kind, d)?;
                if guild.id != self.gateway.guild_id() {
                    debug!("Ignoring guild {}", guild.id);
                    return None;
                }
                if guild.unavailable {
                    warn!("[{}] Guild is unavailable", guild.id);
                    return None;
                }
                let occupants = self.gateway.cache.lock().load_guild(&guild);
                info!(
                    "[{}] Guild '{}' available, {} member(s) in voice",
                    guild.id,
                    guild.name.as_deref().unwrap_or("?"),
                    occupants.len()
                );
                let application_id = *self.gateway.application_id.lock();
                self.emit(GatewayEvent::Ready {
                    application_id,
                    occupants,
                })
            }
            "CHANNEL_CREATE" | "CHANNEL_UPDATE" => {
                let channel: Channel = self.parse(kind, d)?;
                self.gateway.cache.lock().upsert_channel(&channel);
                None
            }
            "CHANNEL_DELETE" => {
                let channel: Channel = self.parse(kind, d)?;
                self.gateway.cache.lock().remove_channel(channel.id);
                None
            }
            "VOICE_STATE_UPDATE" => {
                let state: VoiceState = self.parse(kind, d)?;
                let event = self.gateway.cache.lock().apply_voice_state(&state)?;
                self.emit(event)
            }
            "INTERACTION_CREATE" => {
                let interaction: Interaction = self.parse(kind, d)?;
                let event = self.command_event(interaction)?;
                self.emit(event)
            }
            _ => None,
        }
    }

    /// Maps a slash-command invocation in the tracked guild to a command
    /// event. Every invocation the router sees gets a reply.
    fn command_event(&self, interaction: Interaction) -> Option<GatewayEvent> {
        if interaction.kind != INTERACTION_APPLICATION_COMMAND {
            return None;
        }
        if interaction.guild_id != Some(self.gateway.guild_id()) {
            return None;
        }
        let data = interaction.data.as_ref()?;
        let command = if data.name == TOPIC_COMMAND {
            let topic = data.string_option(TOPIC_OPTION).unwrap_or("").trim();
            Command::SetTopic {
                topic: topic.to_string(),
            }
        } else {
            debug!("Unknown command /{}", data.name);
            Command::Unknown {
                name: data.name.clone(),
            }
        };

        let member = {
            let mut cache = self.gateway.cache.lock();
            match (&interaction.member, &interaction.user) {
                (Some(payload), _) if payload.user.is_some() => {
                    let user_id = payload.user.as_ref()?.id;
                    cache.member(user_id, Some(payload))
                }
                (_, Some(user)) => cache.member(user.id, None),
                _ => {
                    warn!("Interaction {} carries no user", interaction.id);
                    return None;
                }
            }
        };

        Some(GatewayEvent::CommandInvoked {
            member,
            interaction: InteractionHandle {
                id: interaction.id,
                token: interaction.token,
            },
            command,
        })
    }

    fn parse<T: DeserializeOwned>(&self, kind: &str, d: Value) -> Option<T> {
        match serde_json::from_value(d) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(
                    "[{}] Malformed {} payload: {}",
                    self.gateway.guild_id(),
                    kind,
                    e
                );
                None
            }
        }
    }

    /// Hands an event to the router; a closed queue means we are shutting down.
    fn emit(&self, event: GatewayEvent) -> Option<SessionOutcome> {
        match self.gateway.events.send(event) {
            Ok(()) => None,
            Err(_) => Some(SessionOutcome::Shutdown),
        }
    }

    fn send(&self, msg: &GatewayPayload) {
        if let Ok(json) = serde_json::to_string(msg) {
            let _ = self.tx.send(Message::Text(json.into()));
        }
    }
}

impl<'a> Drop for SessionState<'a> {
    fn drop(&mut self) {
        if let Some(h) = self.heartbeat_handle.take() {
            h.abort();
        }
    }
}
