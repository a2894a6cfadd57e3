use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::configs::*;

const CONFIG_CANDIDATES: [&str; 2] = ["config.toml", "config.default.toml"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("environment variable {name} is not valid: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
    #[error("missing required setting {0}")]
    Missing(&'static str),
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Reads `config.toml` (or `config.default.toml`), applies environment
    /// overrides and validates the result.
    ///
    /// A missing file is not an error: the bot can be configured through the
    /// environment alone.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match CONFIG_CANDIDATES.iter().find(|p| Path::new(p).exists()) {
            Some(path) => {
                crate::log_println!("Loading configuration from: {}", path);
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_string(),
                    source,
                })?;
                Self::from_toml(path, &raw)?
            }
            None => {
                crate::log_println!("No config file found, using environment only");
                Self::default()
            }
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(path: &str, raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Overrides file values with `DISCORD_BOT_TOKEN`, `GUILD_ID`,
    /// `LOG_CHANNEL_ID` and `PORT` when they are set and non-empty.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("DISCORD_BOT_TOKEN") {
            self.discord.token = token.trim().to_string();
        }
        if let Some(value) = get("GUILD_ID") {
            self.discord.guild_id = value.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "GUILD_ID",
                value,
            })?;
        }
        if let Some(value) = get("LOG_CHANNEL_ID") {
            self.discord.log_channel_id =
                value.parse().map_err(|_| ConfigError::InvalidEnv {
                    name: "LOG_CHANNEL_ID",
                    value,
                })?;
        }
        if let Some(value) = get("PORT") {
            self.server.port = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "PORT",
                value,
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discord.token.trim().is_empty() {
            return Err(ConfigError::Missing("discord.token (DISCORD_BOT_TOKEN)"));
        }
        if self.discord.guild_id.is_unset() {
            return Err(ConfigError::Missing("discord.guild_id (GUILD_ID)"));
        }
        if self.discord.log_channel_id.is_unset() {
            return Err(ConfigError::Missing("discord.log_channel_id (LOG_CHANNEL_ID)"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::common::types::{ChannelId, GuildId};

    const SAMPLE: &str = r#"
[server]
port = 8080

[discord]
token = "file-token"
guild_id = "111"
log_channel_id = 222

[logging]
level = "debug"
"#;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn parses_file_and_fills_defaults() {
        let config = Config::from_toml("config.toml", SAMPLE).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.discord.guild_id, GuildId(111));
        assert_eq!(config.discord.log_channel_id, ChannelId(222));
        assert_eq!(config.discord.api_base, DEFAULT_API_BASE);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_wins_over_file() {
        let mut config = Config::from_toml("config.toml", SAMPLE).unwrap();
        config
            .apply_env(env(&[
                ("DISCORD_BOT_TOKEN", "env-token"),
                ("GUILD_ID", "333"),
                ("PORT", "10000"),
                ("LOG_CHANNEL_ID", ""),
            ]))
            .unwrap();

        assert_eq!(config.discord.token, "env-token");
        assert_eq!(config.discord.guild_id, GuildId(333));
        assert_eq!(config.discord.log_channel_id, ChannelId(222));
        assert_eq!(config.server.port, 10000);
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let mut config = Config::default();
        let err = config.apply_env(env(&[("GUILD_ID", "abc")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: "GUILD_ID", .. }));
    }

    #[test]
    fn validation_names_the_missing_setting() {
        let mut config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(s)) if s.contains("token")));

        config.discord.token = "t".into();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(s)) if s.contains("guild_id")));

        config.discord.guild_id = GuildId(1);
        assert!(
            matches!(config.validate(), Err(ConfigError::Missing(s)) if s.contains("log_channel_id"))
        );

        config.discord.log_channel_id = ChannelId(2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::from_toml("broken.toml", "[server\nport = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
