//! Recorded event scripts for replaying a playback against the machine

use crate::error::{AvOffsetError, Result};
use crate::playback::event::PlayerEvent;
use serde::Deserialize;
use std::path::Path;

/// Events delivered together as one tick
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScriptTick {
    #[serde(default)]
    pub events: Vec<PlayerEvent>,
}

/// An ordered list of ticks, loaded from TOML
///
/// ```toml
/// [[tick]]
/// events = [{ kind = "paused" }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventScript {
    #[serde(default)]
    pub tick: Vec<ScriptTick>,
}

impl EventScript {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AvOffsetError::Configuration(format!("cannot read script {:?}: {}", path, e))
        })?;
        Self::parse(&content)
            .map_err(|e| AvOffsetError::Configuration(format!("script {:?}: {}", path, e)))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn event_count(&self) -> usize {
        self.tick.iter().map(|t| t.events.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCRIPT: &str = r#"
[[tick]]
[[tick.events]]
kind = "playback_started"
[tick.events.stream.video]
hdr_type = "dolbyvision"
fps = 23.976
[tick.events.stream.audio]
codec = "truehd"
channels = 8
atmos = true

[[tick]]
events = [
    { kind = "audio_stream_changed", stream = { audio = { codec = "eac3", channels = 6 } } },
    { kind = "manual_offset_changed", offset_ms = 45 },
]

[[tick]]
events = [{ kind = "paused" }, { kind = "playback_stopped" }]
"#;

    #[test]
    fn test_parse_script() {
        let script = EventScript::parse(SCRIPT).unwrap();
        assert_eq!(script.tick.len(), 3);
        assert_eq!(script.event_count(), 5);

        match &script.tick[0].events[0] {
            PlayerEvent::PlaybackStarted { stream } => {
                let video = stream.video.as_ref().unwrap();
                assert_eq!(video.hdr_type, "dolbyvision");
                assert_eq!(video.fps, Some(23.976));
                assert!(stream.audio.as_ref().unwrap().atmos);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(
            script.tick[1].events[1],
            PlayerEvent::ManualOffsetChanged { offset_ms: 45 }
        );
        assert_eq!(
            script.tick[2].events,
            vec![PlayerEvent::Paused, PlayerEvent::PlaybackStopped]
        );
    }

    #[test]
    fn test_unknown_event_kind_fails() {
        let err = EventScript::parse("[[tick]]\nevents = [{ kind = \"rewound\" }]\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCRIPT.as_bytes()).unwrap();
        let script = EventScript::load(file.path()).unwrap();
        assert_eq!(script.tick.len(), 3);

        let missing = EventScript::load(Path::new("/nonexistent/script.toml"));
        assert!(matches!(missing, Err(AvOffsetError::Configuration(_))));
    }
}
