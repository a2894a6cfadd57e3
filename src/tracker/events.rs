use crate::common::types::{ApplicationId, UserId};

/// The member an event is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: UserId,
    pub is_bot: bool,
    pub display_name: String,
}

/// Someone already sitting in voice when the bot comes up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceOccupant {
    pub member: Member,
    pub channel_name: String,
}

/// Handle needed to answer a slash-command invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct InteractionHandle {
    pub id: String,
    pub token: String,
}

impl std::fmt::Debug for InteractionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/record topic:<text>`. The topic arrives trimmed and may be empty.
    SetTopic { topic: String },
    /// A command this bot does not handle (stale registration).
    Unknown { name: String },
}

/// Inbound events, in the order the gateway observed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// The tracked guild became available; lists who is already in voice.
    Ready {
        application_id: Option<ApplicationId>,
        occupants: Vec<VoiceOccupant>,
    },
    /// A member's voice channel changed. `None` means not in voice.
    VoiceStateChanged {
        member: Member,
        before: Option<String>,
        after: Option<String>,
    },
    CommandInvoked {
        member: Member,
        interaction: InteractionHandle,
        command: Command,
    },
}

/// Whether a log message should ping the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notify {
    Loud,
    Silent,
}

/// Message the router wants delivered after a transition has committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    LogMessage {
        text: String,
        notify: Notify,
    },
    EphemeralReply {
        interaction: InteractionHandle,
        text: String,
    },
}

impl Outbound {
    pub fn text(&self) -> &str {
        match self {
            Self::LogMessage { text, .. } | Self::EphemeralReply { text, .. } => text,
        }
    }
}
