use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicI64, Ordering},
};

use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::gateway::session::types::{GatewayPayload, opcode};

/// Builds an op 1 payload carrying the last sequence number (or null).
pub fn heartbeat_message(seq: i64) -> Option<Message> {
    let d = if seq < 0 {
        serde_json::Value::Null
    } else {
        serde_json::Value::from(seq)
    };
    let json = serde_json::to_string(&GatewayPayload::new(opcode::HEARTBEAT, d)).ok()?;
    Some(Message::Text(json.into()))
}

/// Sends a heartbeat every `interval_ms`, the first one after a random
/// fraction of the interval.
///
/// If the previous beat was never acknowledged the connection is a zombie:
/// `zombie` is cancelled and the task stops.
pub fn spawn_heartbeat(
    tx_hb: tokio::sync::mpsc::UnboundedSender<Message>,
    seq: Arc<AtomicI64>,
    acked: Arc<AtomicBool>,
    zombie: CancellationToken,
    interval_ms: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let jitter = (interval_ms as f64 * rand::random::<f64>()) as u64;
        let period = tokio::time::Duration::from_millis(interval_ms);
        let start = tokio::time::Instant::now() + tokio::time::Duration::from_millis(jitter);
        let mut interval = tokio::time::interval_at(start, period);

        acked.store(true, Ordering::Relaxed);
        loop {
            interval.tick().await;

            if !acked.swap(false, Ordering::Relaxed) {
                warn!("Heartbeat was not acknowledged; treating connection as dead");
                zombie.cancel();
                break;
            }

            let Some(msg) = heartbeat_message(seq.load(Ordering::Relaxed)) else {
                continue;
            };
            if tx_hb.send(msg).is_err() {
                break;
            }
        }
    })
}
