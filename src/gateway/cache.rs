use std::collections::HashMap;

use crate::{
    common::types::{ChannelId, GuildId, UserId},
    gateway::{
        constants::VOICE_CHANNEL_TYPES,
        models::{Channel, GuildCreate, GuildMember, VoiceState},
    },
    tracker::{GatewayEvent, Member, VoiceOccupant},
};

/// What the gateway knows about the tracked guild.
///
/// Discord's `VOICE_STATE_UPDATE` only carries the new channel, so the
/// previous channel of every member is remembered here to derive the
/// before/after pair.
#[derive(Debug)]
pub struct GuildCache {
    guild_id: GuildId,
    self_id: Option<UserId>,
    channels: HashMap<ChannelId, String>,
    voice: HashMap<UserId, ChannelId>,
    members: HashMap<UserId, Member>,
}

impl GuildCache {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            self_id: None,
            channels: HashMap::new(),
            voice: HashMap::new(),
            members: HashMap::new(),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// The bot's own user, known from READY. Always treated as a bot.
    pub fn set_self_id(&mut self, user_id: UserId) {
        self.self_id = Some(user_id);
    }

    /// Replaces everything with a fresh `GUILD_CREATE` and lists who is in
    /// voice right now.
    pub fn load_guild(&mut self, guild: &GuildCreate) -> Vec<VoiceOccupant> {
        self.channels.clear();
        self.voice.clear();

        for channel in &guild.channels {
            self.upsert_channel(channel);
        }
        for member in &guild.members {
            self.remember(member);
        }

        let mut occupants = Vec::new();
        for state in &guild.voice_states {
            let Some(channel_id) = state.channel_id else {
                continue;
            };
            self.voice.insert(state.user_id, channel_id);
            occupants.push(VoiceOccupant {
                member: self.member(state.user_id, state.member.as_ref()),
                channel_name: self.channel_name(channel_id),
            });
        }
        occupants
    }

    pub fn upsert_channel(&mut self, channel: &Channel) {
        if channel.guild_id.is_some_and(|g| g != self.guild_id) {
            return;
        }
        if !VOICE_CHANNEL_TYPES.contains(&channel.kind) {
            return;
        }
        let name = channel
            .name
            .clone()
            .unwrap_or_else(|| channel.id.to_string());
        self.channels.insert(channel.id, name);
    }

    pub fn remove_channel(&mut self, channel_id: ChannelId) {
        self.channels.remove(&channel_id);
    }

    /// Records a voice state and returns the transition it represents.
    ///
    /// Returns `None` for other guilds and for updates that keep the member in
    /// the same channel (mute, deafen, stream toggles).
    pub fn apply_voice_state(&mut self, state: &VoiceState) -> Option<GatewayEvent> {
        if state.guild_id.is_some_and(|g| g != self.guild_id) {
            return None;
        }

        let previous = match state.channel_id {
            Some(channel_id) => self.voice.insert(state.user_id, channel_id),
            None => self.voice.remove(&state.user_id),
        };
        if previous == state.channel_id {
            return None;
        }

        Some(GatewayEvent::VoiceStateChanged {
            member: self.member(state.user_id, state.member.as_ref()),
            before: previous.map(|id| self.channel_name(id)),
            after: state.channel_id.map(|id| self.channel_name(id)),
        })
    }

    /// Resolves a member, refreshing the cached copy when the payload
    /// carries one.
    pub fn member(&mut self, user_id: UserId, payload: Option<&GuildMember>) -> Member {
        if let Some(member) = payload {
            self.remember(member);
        }
        let mut member = self.members.get(&user_id).cloned().unwrap_or_else(|| Member {
            id: user_id,
            is_bot: false,
            display_name: user_id.to_string(),
        });
        if self.self_id == Some(user_id) {
            member.is_bot = true;
        }
        member
    }

    fn remember(&mut self, member: &GuildMember) {
        let Some(user) = &member.user else {
            return;
        };
        let display_name = member
            .display_name()
            .unwrap_or_else(|| user.id.to_string());
        self.members.insert(
            user.id,
            Member {
                id: user.id,
                is_bot: user.bot,
                display_name,
            },
        );
    }

    fn channel_name(&self, channel_id: ChannelId) -> String {
        self.channels
            .get(&channel_id)
            .cloned()
            .unwrap_or_else(|| channel_id.to_string())
    }
}
