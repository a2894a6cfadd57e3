use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicI64, Ordering},
};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    common::types::{AnyResult, ApplicationId, GuildId},
    gateway::{
        GuildCache,
        constants::{
            GATEWAY_INTENTS, GATEWAY_VERSION, RECONNECT_DELAY_FRESH_MS, WRITE_TASK_SHUTDOWN_MS,
        },
    },
    tracker::GatewayEvent,
};

pub mod backoff;
pub mod handler;
pub mod heartbeat;
pub mod types;

use self::{
    backoff::Backoff,
    types::{
        GatewayError, GatewayPayload, SessionOutcome, is_fatal_close, is_reconnectable_close,
        is_reidentify_close, opcode,
    },
};

/// What is needed to resume a dropped session.
#[derive(Debug, Clone)]
struct ResumeInfo {
    session_id: String,
    resume_url: String,
}

/// Connection to Discord's main gateway for a single guild.
///
/// Dispatches are turned into [`GatewayEvent`]s and pushed onto `events` in
/// the order they arrive.
pub struct GatewayClient {
    token: String,
    gateway_url: String,
    events: flume::Sender<GatewayEvent>,
    cache: Mutex<GuildCache>,
    resume: Mutex<Option<ResumeInfo>>,
    application_id: Mutex<Option<ApplicationId>>,
    seq: Arc<AtomicI64>,
    established: AtomicBool,
    cancel_token: CancellationToken,
}

impl GatewayClient {
    pub fn new(
        token: String,
        gateway_url: String,
        guild_id: GuildId,
        events: flume::Sender<GatewayEvent>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            token,
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            events,
            cache: Mutex::new(GuildCache::new(guild_id)),
            resume: Mutex::new(None),
            application_id: Mutex::new(None),
            seq: Arc::new(AtomicI64::new(-1)),
            established: AtomicBool::new(false),
            cancel_token,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.cache.lock().guild_id()
    }

    /// Runs until cancelled, reconnecting as needed.
    ///
    /// Dropped connections and invalidated sessions are retried forever with
    /// a capped backoff. Returns an error only when Discord rejects the
    /// session with a fatal close code.
    pub async fn run(&self) -> AnyResult<()> {
        let mut backoff = Backoff::new();
        let mut is_resume = false;

        loop {
            if self.cancel_token.is_cancelled() {
                return Ok(());
            }

            let outcome = self.connect(is_resume).await;
            if self.established.swap(false, Ordering::AcqRel) {
                backoff.reset();
            }

            match outcome {
                Ok(SessionOutcome::Shutdown) => {
                    debug!("[{}] Gateway shutting down cleanly", self.guild_id());
                    return Ok(());
                }
                Ok(SessionOutcome::Fatal { code, reason }) => {
                    error!(
                        "[{}] Gateway rejected the session: code={}, reason='{}'",
                        self.guild_id(),
                        code,
                        reason
                    );
                    return Err(GatewayError::Fatal { code, reason }.into());
                }
                Ok(SessionOutcome::Reconnect) => {
                    let delay = backoff.next();
                    debug!(
                        "[{}] Reconnecting in {:?} (resume=true, failures={})",
                        self.guild_id(),
                        delay,
                        backoff.failures()
                    );
                    self.sleep(delay).await;
                    is_resume = true;
                }
                Ok(SessionOutcome::Identify) => {
                    is_resume = false;
                    self.forget_session();
                    let delay = backoff
                        .next()
                        .max(std::time::Duration::from_millis(RECONNECT_DELAY_FRESH_MS));
                    debug!(
                        "[{}] Session invalid; identifying fresh in {:?}",
                        self.guild_id(),
                        delay
                    );
                    self.sleep(delay).await;
                }
                Err(e) => {
                    let delay = backoff.next();
                    warn!(
                        "[{}] Connection error: {}. Retrying in {:?} (failures={})",
                        self.guild_id(),
                        e,
                        delay,
                        backoff.failures()
                    );
                    self.sleep(delay).await;
                    is_resume = self.resume.lock().is_some();
                }
            }
        }
    }

    async fn connect(&self, is_resume: bool) -> AnyResult<SessionOutcome> {
        let resume_url = self.resume.lock().as_ref().map(|r| r.resume_url.clone());
        let is_resume = is_resume && resume_url.is_some();
        let base = match resume_url {
            Some(url) if is_resume => url.trim_end_matches('/').to_string(),
            _ => self.gateway_url.clone(),
        };
        let url = format!("{}/?v={}&encoding=json", base, GATEWAY_VERSION);
        debug!("[{}] Connecting to gateway: {}", self.guild_id(), url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&url).await?;
        let (mut write, mut read) = ws_stream.split();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Message>();

        // Cancelled when this connection ends, or by the heartbeat on a missed ack.
        let conn = self.cancel_token.child_token();
        let write_cancel = conn.clone();
        let guild_id = self.guild_id();
        let write_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = write_cancel.cancelled() => break,
                    msg = rx.recv() => {
                        let Some(msg) = msg else { break };
                        if let Err(e) = write.send(msg).await {
                            warn!("[{}] WS write error: {}", guild_id, e);
                            break;
                        }
                    }
                }
            }
            let _ = write.close().await;
        });

        let mut state = handler::SessionState::new(self, tx.clone(), is_resume, conn.clone());

        let outcome = loop {
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    break SessionOutcome::Shutdown;
                }
                _ = conn.cancelled() => {
                    break SessionOutcome::Reconnect;
                }
                msg = read.next() => {
                    let msg = match msg {
                        Some(Ok(msg)) => msg,
                        Some(Err(e)) => {
                            warn!("[{}] WS read error: {}", self.guild_id(), e);
                            break SessionOutcome::Reconnect;
                        }
                        None => {
                            debug!("[{}] WS stream ended", self.guild_id());
                            break SessionOutcome::Reconnect;
                        }
                    };

                    match msg {
                        Message::Text(text) => {
                            if let Some(outcome) = state.handle_text(text.as_str()) {
                                break outcome;
                            }
                        }
                        Message::Close(frame) => {
                            let (code, reason) = frame
                                .map(|cf| (cf.code.into(), cf.reason.to_string()))
                                .unwrap_or((1000u16, "No reason".into()));

                            info!(
                                "[{}] WS closed: code={}, reason='{}'",
                                self.guild_id(), code, reason
                            );
                            break close_outcome(code, reason);
                        }
                        _ => {}
                    }
                }
            }
        };

        drop(state);
        conn.cancel();
        drop(tx);
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(WRITE_TASK_SHUTDOWN_MS),
            write_task,
        )
        .await;

        Ok(outcome)
    }

    fn identify_message(&self) -> GatewayPayload {
        GatewayPayload::new(
            opcode::IDENTIFY,
            serde_json::json!({
                "token": self.token,
                "intents": GATEWAY_INTENTS,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": env!("CARGO_PKG_NAME"),
                    "device": env!("CARGO_PKG_NAME"),
                },
            }),
        )
    }

    /// `None` when there is no session to resume.
    fn resume_message(&self) -> Option<GatewayPayload> {
        let resume = self.resume.lock();
        let info = resume.as_ref()?;
        let seq = self.seq.load(Ordering::Relaxed);
        let seq = (seq >= 0).then_some(seq);
        Some(GatewayPayload::new(
            opcode::RESUME,
            serde_json::json!({
                "token": self.token,
                "session_id": info.session_id,
                "seq": seq,
            }),
        ))
    }

    fn forget_session(&self) {
        *self.resume.lock() = None;
        self.seq.store(-1, Ordering::Relaxed);
    }

    async fn sleep(&self, delay: std::time::Duration) {
        tokio::select! {
            _ = self.cancel_token.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

impl Drop for GatewayClient {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

fn close_outcome(code: u16, reason: String) -> SessionOutcome {
    if is_fatal_close(code) {
        return SessionOutcome::Fatal { code, reason };
    }
    if is_reidentify_close(code) {
        return SessionOutcome::Identify;
    }
    if !is_reconnectable_close(code) {
        debug!("Unknown close code {}; trying to resume", code);
    }
    SessionOutcome::Reconnect
}
