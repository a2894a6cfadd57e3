use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway opcodes the client sends or handles.
pub mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RESUME: u8 = 6;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayPayload {
    pub fn new(op: u8, d: Value) -> Self {
        Self {
            op,
            d,
            s: None,
            t: None,
        }
    }
}

/// Outcome of a single WS session; tells the outer loop what to do next.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Dropped connection; reconnect and resume.
    Reconnect,
    /// Session is gone; reconnect with a fresh Identify.
    Identify,
    /// Discord refused the session; retrying cannot help.
    Fatal { code: u16, reason: String },
    /// Stop for good.
    Shutdown,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway closed the connection with fatal code {code}: {reason}")]
    Fatal { code: u16, reason: String },
}

/// Close codes after which the session can be resumed.
pub fn is_reconnectable_close(code: u16) -> bool {
    matches!(
        code,
        1000 | 1001 | 4000 | 4001 | 4002 | 4003 | 4005 | 4008
    )
}

/// Close codes that invalidate the session: identify again.
pub fn is_reidentify_close(code: u16) -> bool {
    matches!(code, 4007 | 4009)
}

/// Close codes that must not be retried.
///
/// - `4004`: authentication failed
/// - `4010`..`4012`: invalid shard, sharding required, invalid API version
/// - `4013`, `4014`: invalid or disallowed intents
pub fn is_fatal_close(code: u16) -> bool {
    matches!(code, 4004 | 4010 | 4011 | 4012 | 4013 | 4014)
}
