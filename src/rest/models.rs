use serde::Serialize;

/// Message flag: no push or desktop notification.
pub const FLAG_SUPPRESS_NOTIFICATIONS: u64 = 1 << 12;

/// Message flag: only the invoking user can see the reply.
pub const FLAG_EPHEMERAL: u64 = 1 << 6;

/// Interaction callback type `CHANNEL_MESSAGE_WITH_SOURCE`.
pub const CALLBACK_CHANNEL_MESSAGE: u8 = 4;

/// Body of `POST /channels/{id}/messages`.
#[derive(Debug, Serialize)]
pub struct CreateMessage<'a> {
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    pub allowed_mentions: AllowedMentions,
}

/// Display names are echoed into messages verbatim; nothing they contain
/// should turn into a ping.
#[derive(Debug, Serialize, Default)]
pub struct AllowedMentions {
    pub parse: Vec<&'static str>,
}

/// Body of `POST /interactions/{id}/{token}/callback`.
#[derive(Debug, Serialize)]
pub struct InteractionResponse<'a> {
    #[serde(rename = "type")]
    pub kind: u8,
    pub data: InteractionCallbackData<'a>,
}

#[derive(Debug, Serialize)]
pub struct InteractionCallbackData<'a> {
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    pub allowed_mentions: AllowedMentions,
}

/// A chat-input application command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub kind: u8,
    pub options: Vec<CommandOptionDefinition>,
    /// Interaction contexts; `0` is guild-only.
    pub contexts: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandOptionDefinition {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub max_length: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_message_sets_suppress_flag() {
        let body = CreateMessage {
            content: "hi",
            flags: Some(FLAG_SUPPRESS_NOTIFICATIONS),
            allowed_mentions: AllowedMentions::default(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["flags"], 4096);
        assert_eq!(json["allowed_mentions"]["parse"], serde_json::json!([]));
    }

    #[test]
    fn loud_message_omits_flags() {
        let body = CreateMessage {
            content: "hi",
            flags: None,
            allowed_mentions: AllowedMentions::default(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("flags").is_none());
    }

    #[test]
    fn ephemeral_callback_shape() {
        let body = InteractionResponse {
            kind: CALLBACK_CHANNEL_MESSAGE,
            data: InteractionCallbackData {
                content: "ok",
                flags: Some(FLAG_EPHEMERAL),
                allowed_mentions: AllowedMentions::default(),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], 4);
        assert_eq!(json["data"]["flags"], 64);
        assert_eq!(json["data"]["content"], "ok");
    }
}
