/// Discord gateway API version in the WebSocket URL.
pub const GATEWAY_VERSION: u8 = 10;

/// `GUILDS | GUILD_MEMBERS | GUILD_VOICE_STATES`.
pub const GATEWAY_INTENTS: u64 = (1 << 0) | (1 << 1) | (1 << 7);

/// Base delay (ms) for the exponential backoff on reconnect.
pub const BACKOFF_BASE_MS: u64 = 1_000;

/// The backoff stops doubling after this many steps (8s).
pub const BACKOFF_MAX_SHIFT: u32 = 3;

/// Fixed delay (ms) before a fresh Identify after an invalid session.
pub const RECONNECT_DELAY_FRESH_MS: u64 = 2_500;

/// Timeout (ms) allowed for the WS write task to shut down gracefully.
pub const WRITE_TASK_SHUTDOWN_MS: u64 = 500;

/// Interaction type for slash commands.
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;

/// Channel types that carry voice: `GUILD_VOICE` and `GUILD_STAGE_VOICE`.
pub const VOICE_CHANNEL_TYPES: [u8; 2] = [2, 13];
