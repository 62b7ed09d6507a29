//! Playback event handling: sessions, the state machine and its host boundary

mod event;
mod host;
mod machine;
pub mod notify;
mod script;
mod service;
mod session;

pub use event::PlayerEvent;
pub use host::{HostCommand, PlayerHost, RecordingHost};
pub use machine::{MachineConfig, PlaybackMachine, PlaybackState};
pub use notify::NotificationConfig;
pub use script::{EventScript, ScriptTick};
pub use service::{EventSender, EventService, ServiceMessage, ServiceState};
pub use session::PlaybackSession;
