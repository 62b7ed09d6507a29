//! Seek-back decisions and per-tick coalescing

use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Playback transition that may call for a seek-back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeekTrigger {
    PlaybackStart,
    AudioTrackChanged,
    OffsetAdjusted,
    Unpaused,
}

impl SeekTrigger {
    /// Higher wins when several triggers share a tick
    ///
    /// Offset corrections come first since they follow a user-visible action.
    pub fn priority(self) -> u8 {
        match self {
            SeekTrigger::OffsetAdjusted => 3,
            SeekTrigger::AudioTrackChanged => 2,
            SeekTrigger::PlaybackStart => 1,
            SeekTrigger::Unpaused => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SeekTrigger::PlaybackStart => "playback_start",
            SeekTrigger::AudioTrackChanged => "audio_track_changed",
            SeekTrigger::OffsetAdjusted => "offset_adjusted",
            SeekTrigger::Unpaused => "unpaused",
        }
    }
}

impl fmt::Display for SeekTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Enable flag and rewind duration for one trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerSetting {
    pub enabled: bool,
    pub duration: Duration,
}

impl TriggerSetting {
    pub fn enabled(duration: Duration) -> Self {
        Self {
            enabled: true,
            duration,
        }
    }
}

/// Seek-back settings, one entry per trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeekBackConfig {
    pub playback_start: TriggerSetting,
    pub audio_track_changed: TriggerSetting,
    pub offset_adjusted: TriggerSetting,
    pub unpaused: TriggerSetting,
}

impl SeekBackConfig {
    pub fn setting(&self, trigger: SeekTrigger) -> &TriggerSetting {
        match trigger {
            SeekTrigger::PlaybackStart => &self.playback_start,
            SeekTrigger::AudioTrackChanged => &self.audio_track_changed,
            SeekTrigger::OffsetAdjusted => &self.offset_adjusted,
            SeekTrigger::Unpaused => &self.unpaused,
        }
    }
}

/// Rewind for a trigger, `None` when the trigger is disabled
///
/// A zero duration is still a decision: it takes part in coalescing but
/// issues no host command.
pub fn decide(trigger: SeekTrigger, config: &SeekBackConfig) -> Option<Duration> {
    let setting = config.setting(trigger);
    setting.enabled.then_some(setting.duration)
}

/// Identifies one seek-back decision so it can fire at most once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdempotenceKey {
    pub session_id: u64,
    pub trigger: SeekTrigger,
    pub event_seq: u64,
}

/// A decided, not yet executed seek-back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekBackRequest {
    pub trigger: SeekTrigger,
    pub duration: Duration,
    pub key: IdempotenceKey,
}

impl SeekBackRequest {
    pub fn new(session_id: u64, event_seq: u64, trigger: SeekTrigger, duration: Duration) -> Self {
        Self {
            trigger,
            duration,
            key: IdempotenceKey {
                session_id,
                trigger,
                event_seq,
            },
        }
    }
}

/// Pick the request that executes; earliest wins among equal priorities
pub fn coalesce(requests: &[SeekBackRequest]) -> Option<SeekBackRequest> {
    requests.iter().copied().reduce(|best, next| {
        if next.trigger.priority() > best.trigger.priority() {
            next
        } else {
            best
        }
    })
}

/// Seek-back candidates collected during one event-processing tick
#[derive(Debug, Default)]
pub struct CoalescingWindow {
    candidates: Vec<SeekBackRequest>,
}

impl CoalescingWindow {
    pub fn push(&mut self, request: SeekBackRequest) {
        debug!(
            "Seek-back candidate: {} ({:?})",
            request.trigger, request.duration
        );
        self.candidates.push(request);
    }

    pub fn is_pending(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// Close the window, returning the winning request
    pub fn close(&mut self) -> Option<SeekBackRequest> {
        let winner = coalesce(&self.candidates);
        if let Some(winner) = winner {
            for dropped in self.candidates.iter().filter(|c| c.key != winner.key) {
                debug!(
                    "Seek-back on {} superseded by {}",
                    dropped.trigger, winner.trigger
                );
            }
        }
        self.candidates.clear();
        winner
    }

    /// Drop all candidates without executing any
    pub fn discard(&mut self) -> usize {
        let count = self.candidates.len();
        self.candidates.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SeekBackConfig {
        SeekBackConfig {
            playback_start: TriggerSetting::enabled(Duration::from_secs(5)),
            audio_track_changed: TriggerSetting::enabled(Duration::from_secs(3)),
            offset_adjusted: TriggerSetting::enabled(Duration::from_secs(2)),
            unpaused: TriggerSetting {
                enabled: false,
                duration: Duration::from_secs(4),
            },
        }
    }

    #[test]
    fn test_decide() {
        let config = config();
        assert_eq!(
            decide(SeekTrigger::PlaybackStart, &config),
            Some(Duration::from_secs(5))
        );
        assert_eq!(decide(SeekTrigger::Unpaused, &config), None);

        let zero = SeekBackConfig {
            unpaused: TriggerSetting::enabled(Duration::ZERO),
            ..config
        };
        assert_eq!(decide(SeekTrigger::Unpaused, &zero), Some(Duration::ZERO));
    }

    #[test]
    fn test_priority_order() {
        assert!(SeekTrigger::OffsetAdjusted.priority() > SeekTrigger::AudioTrackChanged.priority());
        assert!(SeekTrigger::AudioTrackChanged.priority() > SeekTrigger::PlaybackStart.priority());
        assert!(SeekTrigger::PlaybackStart.priority() > SeekTrigger::Unpaused.priority());
    }

    #[test]
    fn test_coalesce_highest_priority_wins() {
        let requests = [
            SeekBackRequest::new(1, 1, SeekTrigger::PlaybackStart, Duration::from_secs(5)),
            SeekBackRequest::new(1, 2, SeekTrigger::AudioTrackChanged, Duration::from_secs(3)),
            SeekBackRequest::new(1, 3, SeekTrigger::OffsetAdjusted, Duration::from_secs(2)),
            SeekBackRequest::new(1, 4, SeekTrigger::AudioTrackChanged, Duration::from_secs(3)),
        ];
        let winner = coalesce(&requests).unwrap();
        assert_eq!(winner.trigger, SeekTrigger::OffsetAdjusted);
        assert_eq!(winner.duration, Duration::from_secs(2));
        assert_eq!(coalesce(&[]), None);
    }

    #[test]
    fn test_coalesce_tie_keeps_earliest() {
        let requests = [
            SeekBackRequest::new(1, 7, SeekTrigger::AudioTrackChanged, Duration::from_secs(3)),
            SeekBackRequest::new(1, 8, SeekTrigger::AudioTrackChanged, Duration::from_secs(3)),
        ];
        assert_eq!(coalesce(&requests).unwrap().key.event_seq, 7);
    }

    #[test]
    fn test_window_close_and_discard() {
        let mut window = CoalescingWindow::default();
        assert!(!window.is_pending());
        window.push(SeekBackRequest::new(1, 1, SeekTrigger::Unpaused, Duration::from_secs(1)));
        window.push(SeekBackRequest::new(1, 2, SeekTrigger::PlaybackStart, Duration::from_secs(5)));
        assert!(window.is_pending());

        let winner = window.close().unwrap();
        assert_eq!(winner.trigger, SeekTrigger::PlaybackStart);
        assert!(!window.is_pending());
        assert_eq!(window.close(), None);

        window.push(SeekBackRequest::new(1, 3, SeekTrigger::Unpaused, Duration::from_secs(1)));
        assert_eq!(window.discard(), 1);
        assert_eq!(window.close(), None);
    }
}
