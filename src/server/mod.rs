pub mod app_state;
pub mod event_loop;

pub use app_state::{AppState, now_ms};
pub use event_loop::run_event_loop;
