//! Outbound commands to the host player

use crate::error::{AvOffsetError, Result};
use crate::offset::AudioOffset;
use std::fmt;
use std::time::Duration;

/// Host player commands issued by the state machine
///
/// Calls are fire-and-forget: an `Err` is logged and playback continues.
pub trait PlayerHost {
    /// Set the player's audio delay
    fn set_audio_offset(&mut self, offset: AudioOffset) -> Result<()>;

    /// Seek backwards by `rewind` from the current position
    fn seek_relative(&mut self, rewind: Duration) -> Result<()>;

    /// Show a short on-screen notification
    fn notify(&mut self, message: &str, display_for: Duration) -> Result<()>;
}

/// A command as issued, for logging and recording hosts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    SetAudioOffset(AudioOffset),
    SeekRelative(Duration),
    Notify(String),
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostCommand::SetAudioOffset(offset) => write!(f, "SetAudioOffset({})", offset),
            HostCommand::SeekRelative(rewind) => {
                write!(f, "SeekRelative(-{:.1}s)", rewind.as_secs_f64())
            }
            HostCommand::Notify(message) => {
                write!(f, "Notify({:?})", message)
            }
        }
    }
}

/// Host that keeps every command it receives, for tests and dry runs
///
/// Offset and seek commands can be set to fail.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub commands: Vec<HostCommand>,
    pub fail_offsets: bool,
    pub fail_seeks: bool,
}

impl RecordingHost {
    pub fn offsets(&self) -> Vec<AudioOffset> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                HostCommand::SetAudioOffset(offset) => Some(*offset),
                _ => None,
            })
            .collect()
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                HostCommand::SeekRelative(rewind) => Some(*rewind),
                _ => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                HostCommand::Notify(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl PlayerHost for RecordingHost {
    fn set_audio_offset(&mut self, offset: AudioOffset) -> Result<()> {
        if self.fail_offsets {
            return Err(AvOffsetError::host_command(
                "SetAudioOffset",
                "rejected by host",
            ));
        }
        self.commands.push(HostCommand::SetAudioOffset(offset));
        Ok(())
    }

    fn seek_relative(&mut self, rewind: Duration) -> Result<()> {
        if self.fail_seeks {
            return Err(AvOffsetError::host_command(
                "SeekRelative",
                "rejected by host",
            ));
        }
        self.commands.push(HostCommand::SeekRelative(rewind));
        Ok(())
    }

    fn notify(&mut self, message: &str, _display_for: Duration) -> Result<()> {
        self.commands.push(HostCommand::Notify(message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display() {
        assert_eq!(
            HostCommand::SetAudioOffset(AudioOffset::from_millis(60)).to_string(),
            "SetAudioOffset(+60 ms)"
        );
        assert_eq!(
            HostCommand::SeekRelative(Duration::from_secs(5)).to_string(),
            "SeekRelative(-5.0s)"
        );
    }

    #[test]
    fn test_recording_host_failures() {
        let mut host = RecordingHost {
            fail_seeks: true,
            ..Default::default()
        };
        assert!(host.set_audio_offset(AudioOffset::from_millis(10)).is_ok());
        assert!(host.seek_relative(Duration::from_secs(1)).is_err());
        assert_eq!(host.offsets(), vec![AudioOffset::from_millis(10)]);
        assert!(host.seeks().is_empty());
    }
}
