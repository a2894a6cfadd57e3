//! Voice-session tracking: who is in voice, since when, and on what topic.

pub mod duration;
pub mod events;
pub mod messages;
pub mod notifier;
pub mod registry;
pub mod router;

pub use duration::format_duration;
pub use events::*;
pub use notifier::Notifier;
pub use registry::{ClosedSession, RegistrySnapshot, SessionRegistry, SessionView};
pub use router::EventRouter;
