use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    rest::{DiscordRest, sync_commands},
    server::AppState,
    tracker::{EventRouter, GatewayEvent},
};

/// Drains gateway events one at a time, in arrival order.
///
/// Each event is fully processed (transition and outbound send) before the
/// next is taken. The first `Ready` also registers the slash commands and
/// flips the status surface to ready.
pub async fn run_event_loop(
    events: flume::Receiver<GatewayEvent>,
    router: EventRouter,
    rest: Arc<DiscordRest>,
    state: Arc<AppState>,
    cancel: CancellationToken,
) {
    let guild_id = state.config.discord.guild_id;
    let mut commands_synced = false;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv_async() => match event {
                Ok(event) => event,
                Err(_) => {
                    debug!("Gateway event queue closed");
                    break;
                }
            },
        };

        let ready_app = match &event {
            GatewayEvent::Ready { application_id, .. } => Some(*application_id),
            _ => None,
        };

        router.dispatch(event).await;

        let Some(application_id) = ready_app else {
            continue;
        };

        if !commands_synced {
            match application_id {
                Some(app) => {
                    sync_commands(&rest, app, guild_id).await;
                    commands_synced = true;
                }
                None => warn!("Ready without an application id; skipping command sync"),
            }
        }

        if !state.status.is_ready() {
            info!(
                "Bot is ready, tracking {} session(s)",
                state.status.active_sessions()
            );
        }
        state.status.mark_ready();
    }

    info!("Event loop stopped");
}
