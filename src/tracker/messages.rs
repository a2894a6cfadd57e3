//! User-facing message text.

use crate::tracker::{duration::format_duration, registry::ClosedSession};

pub fn joined(display_name: &str, channel_name: &str) -> String {
    format!(
        "⚠️ Heads up! **{}** joined voice channel `{}`",
        display_name, channel_name
    )
}

pub fn left(display_name: &str, closed: &ClosedSession) -> String {
    let elapsed = format_duration(closed.elapsed_secs());
    match closed.topic.as_deref() {
        Some(topic) => format!(
            "🕐 {} spent {} in {} on **{}**    nice work!",
            display_name, elapsed, closed.channel_name, topic
        ),
        None => format!(
            "🕐 {} spent {} in {} levelling up solo    nice work!",
            display_name, elapsed, closed.channel_name
        ),
    }
}

pub fn topic_set(topic: &str, channel_name: &str) -> String {
    format!("✅ Topic set to **{}**\n📍 Channel: {}", topic, channel_name)
}

pub fn topic_needs_voice() -> String {
    "⚠️ You don't seem to be in a voice channel.\nJoin one first, then set your topic.".to_string()
}

pub fn topic_blank() -> String {
    "⚠️ The topic can't be empty. Try `/record topic:Calculus`.".to_string()
}

pub fn unknown_command(name: &str) -> String {
    format!("⚠️ `/{}` isn't something I can do anymore.", name)
}
