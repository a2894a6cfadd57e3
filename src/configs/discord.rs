use serde::{Deserialize, Serialize};

use crate::common::types::{ChannelId, GuildId};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg";

#[derive(Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token, without the `Bot ` prefix.
    pub token: String,
    /// The one server whose voice channels are tracked.
    pub guild_id: GuildId,
    /// Channel that receives join and leave summaries.
    pub log_channel_id: ChannelId,
    pub api_base: String,
    pub gateway_url: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            guild_id: GuildId::default(),
            log_channel_id: ChannelId::default(),
            api_base: DEFAULT_API_BASE.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("guild_id", &self.guild_id)
            .field("log_channel_id", &self.log_channel_id)
            .field("api_base", &self.api_base)
            .field("gateway_url", &self.gateway_url)
            .finish()
    }
}
