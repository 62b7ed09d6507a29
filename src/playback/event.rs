//! Inbound events from the host player

use crate::stream::StreamInfo;
use serde::Deserialize;

/// Playback lifecycle event, delivered in arrival order
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// A media item started playing and its streams are known
    PlaybackStarted {
        #[serde(default)]
        stream: StreamInfo,
    },
    /// The active audio stream (or rendition) changed
    AudioStreamChanged {
        #[serde(default)]
        stream: StreamInfo,
    },
    Paused,
    Unpaused,
    /// The user changed the audio offset through the player's own controls
    ManualOffsetChanged { offset_ms: i64 },
    /// The host jumped to another position
    Seeked,
    /// The host changed playback speed
    SpeedChanged,
    /// Monitoring mode was switched on or off
    MonitoringChanged { enabled: bool },
    PlaybackStopped,
    /// Playback reached the end of the item
    PlaybackEnded,
}

impl PlayerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::PlaybackStarted { .. } => "playback_started",
            PlayerEvent::AudioStreamChanged { .. } => "audio_stream_changed",
            PlayerEvent::Paused => "paused",
            PlayerEvent::Unpaused => "unpaused",
            PlayerEvent::ManualOffsetChanged { .. } => "manual_offset_changed",
            PlayerEvent::Seeked => "seeked",
            PlayerEvent::SpeedChanged => "speed_changed",
            PlayerEvent::MonitoringChanged { .. } => "monitoring_changed",
            PlayerEvent::PlaybackStopped => "playback_stopped",
            PlayerEvent::PlaybackEnded => "playback_ended",
        }
    }
}
