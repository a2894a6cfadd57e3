use tracing::{error, info, warn};

use crate::{
    common::types::{ApplicationId, GuildId},
    rest::{DiscordRest, models::*},
};

pub const TOPIC_COMMAND: &str = "record";
pub const TOPIC_OPTION: &str = "topic";

const CHAT_INPUT: u8 = 1;
const OPTION_STRING: u8 = 3;
const CONTEXT_GUILD: u8 = 0;

/// `/record topic:<text>`, guild only.
pub fn topic_command() -> CommandDefinition {
    CommandDefinition {
        name: TOPIC_COMMAND,
        description: "Set the topic for your current voice session",
        kind: CHAT_INPUT,
        options: vec![CommandOptionDefinition {
            kind: OPTION_STRING,
            name: TOPIC_OPTION,
            description: "What you are working on, e.g. Calculus",
            required: true,
            max_length: 200,
        }],
        contexts: vec![CONTEXT_GUILD],
    }
}

/// Registers the command set on the guild, falling back to a global
/// registration when the guild call fails or registers nothing.
///
/// Returns the number of commands registered; failures are logged.
pub async fn sync_commands(
    rest: &DiscordRest,
    application_id: ApplicationId,
    guild_id: GuildId,
) -> usize {
    let commands = [topic_command()];

    match rest
        .overwrite_guild_commands(application_id, guild_id, &commands)
        .await
    {
        Ok(count) if count > 0 => {
            info!("Synced {} command(s) to guild {}", count, guild_id);
            return count;
        }
        Ok(_) => warn!("Guild {} accepted no commands, trying global sync", guild_id),
        Err(e) => warn!("Guild command sync failed: {}. Trying global sync", e),
    }

    match rest
        .overwrite_global_commands(application_id, &commands)
        .await
    {
        Ok(count) => {
            info!("Synced {} command(s) globally", count);
            count
        }
        Err(e) => {
            error!("Global command sync failed too: {}", e);
            0
        }
    }
}
