use async_trait::async_trait;

use crate::{
    common::types::{AnyResult, ChannelId},
    tracker::events::{InteractionHandle, Notify},
};

/// Outbound side of the chat platform.
///
/// Implementations report failures; callers log and drop them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, channel_id: ChannelId, text: &str, notify: Notify)
    -> AnyResult<()>;

    /// Replies to a command so only the invoker sees it.
    async fn reply_ephemeral(&self, interaction: &InteractionHandle, text: &str) -> AnyResult<()>;
}
