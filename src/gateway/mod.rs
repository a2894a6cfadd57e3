//! Discord gateway client: keeps a WebSocket session alive and turns raw
//! dispatches for the tracked guild into [`GatewayEvent`]s.
//!
//! [`GatewayEvent`]: crate::tracker::GatewayEvent

pub mod cache;
pub mod constants;
pub mod models;
pub mod session;

pub use cache::GuildCache;
pub use session::GatewayClient;
