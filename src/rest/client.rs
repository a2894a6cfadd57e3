use async_trait::async_trait;
use reqwest::{Client, Method, Response, header::AUTHORIZATION};
use serde::Serialize;
use tracing::debug;

use crate::{
    common::{
        HttpClient,
        types::{AnyResult, ApplicationId, ChannelId, GuildId},
    },
    rest::models::*,
    tracker::{InteractionHandle, Notifier, Notify},
};

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{method} {route} returned {status}: {body}")]
    Status {
        method: Method,
        route: String,
        status: u16,
        body: String,
    },
}

/// Minimal Discord REST client authenticated as the bot.
pub struct DiscordRest {
    http: Client,
    api_base: String,
    token: String,
}

impl DiscordRest {
    pub fn new(api_base: &str, token: &str) -> Result<Self, RestError> {
        Ok(Self {
            http: HttpClient::new()?,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Sends `body` as JSON. `label` names the route in errors and logs so
    /// secrets in the path (interaction tokens) are never printed.
    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        label: &str,
        body: &B,
    ) -> Result<Response, RestError> {
        let url = format!("{}{}", self.api_base, path);
        debug!("{} {}", method, label);

        let response = self
            .http
            .request(method.clone(), &url)
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RestError::Status {
            method,
            route: label.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    pub async fn create_message(
        &self,
        channel_id: ChannelId,
        content: &str,
        silent: bool,
    ) -> Result<(), RestError> {
        let path = format!("/channels/{}/messages", channel_id);
        let body = CreateMessage {
            content,
            flags: silent.then_some(FLAG_SUPPRESS_NOTIFICATIONS),
            allowed_mentions: AllowedMentions::default(),
        };
        self.request(Method::POST, &path, &path, &body).await?;
        Ok(())
    }

    pub async fn create_interaction_response(
        &self,
        interaction: &InteractionHandle,
        content: &str,
        ephemeral: bool,
    ) -> Result<(), RestError> {
        let path = format!(
            "/interactions/{}/{}/callback",
            interaction.id, interaction.token
        );
        let label = format!("/interactions/{}/:token/callback", interaction.id);
        let body = InteractionResponse {
            kind: CALLBACK_CHANNEL_MESSAGE,
            data: InteractionCallbackData {
                content,
                flags: ephemeral.then_some(FLAG_EPHEMERAL),
                allowed_mentions: AllowedMentions::default(),
            },
        };
        self.request(Method::POST, &path, &label, &body).await?;
        Ok(())
    }

    /// Replaces the guild's commands; returns how many Discord now lists.
    pub async fn overwrite_guild_commands(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        commands: &[CommandDefinition],
    ) -> Result<usize, RestError> {
        let path = format!(
            "/applications/{}/guilds/{}/commands",
            application_id, guild_id
        );
        let registered: Vec<serde_json::Value> = self
            .request(Method::PUT, &path, &path, commands)
            .await?
            .json()
            .await?;
        Ok(registered.len())
    }

    /// Replaces the global commands; returns how many Discord now lists.
    pub async fn overwrite_global_commands(
        &self,
        application_id: ApplicationId,
        commands: &[CommandDefinition],
    ) -> Result<usize, RestError> {
        let path = format!("/applications/{}/commands", application_id);
        let registered: Vec<serde_json::Value> = self
            .request(Method::PUT, &path, &path, commands)
            .await?
            .json()
            .await?;
        Ok(registered.len())
    }
}

#[async_trait]
impl Notifier for DiscordRest {
    async fn send_message(
        &self,
        channel_id: ChannelId,
        text: &str,
        notify: Notify,
    ) -> AnyResult<()> {
        self.create_message(channel_id, text, notify == Notify::Silent)
            .await?;
        Ok(())
    }

    async fn reply_ephemeral(&self, interaction: &InteractionHandle, text: &str) -> AnyResult<()> {
        self.create_interaction_response(interaction, text, true)
            .await?;
        Ok(())
    }
}
