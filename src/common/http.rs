use std::time::Duration;

use reqwest::{Client, Error};

pub struct HttpClient;

impl HttpClient {
    /// Discord rejects bot requests without a `DiscordBot (name, version)` agent.
    pub fn default_user_agent() -> String {
        format!(
            "DiscordBot ({}, {})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )
    }

    pub fn new() -> Result<Client, Error> {
        Client::builder()
            .user_agent(Self::default_user_agent())
            .timeout(Duration::from_secs(10))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_follows_discord_format() {
        let ua = HttpClient::default_user_agent();
        assert!(ua.starts_with("DiscordBot (inside-curl, "));
        assert!(ua.ends_with(&format!("{})", env!("CARGO_PKG_VERSION"))));
    }
}
