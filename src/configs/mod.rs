pub mod base;
pub mod discord;
pub mod logging;
pub mod server;

pub use base::*;
pub use discord::*;
pub use logging::*;
pub use server::*;
