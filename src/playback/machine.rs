//! Playback state machine - classification, offset application, monitoring
//! capture and seek-back coordination

use crate::offset::{AudioOffset, OffsetStore};
use crate::playback::event::PlayerEvent;
use crate::playback::host::PlayerHost;
use crate::playback::notify::{self, NotificationConfig};
use crate::playback::session::PlaybackSession;
use crate::seek::{self, SeekBackConfig, SeekBackRequest, SeekTrigger};
use crate::stream::{classify, ClassifierOptions, StreamInfo};
use tracing::{debug, info, warn};

/// Machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No media playing
    Idle,
    /// Session created, waiting for stream metadata
    Starting,
    /// Playing; the only state that applies offsets and issues seek-backs
    Active,
    Paused,
    /// Session torn down, returns to Idle
    Stopped,
}

/// Settings the machine reads but never changes
#[derive(Debug, Clone, Default)]
pub struct MachineConfig {
    pub classifier: ClassifierOptions,
    pub seek_back: SeekBackConfig,
    pub notifications: NotificationConfig,
}

/// Consumes host events in order and drives the host player
///
/// Events are handled in ticks: every event of a tick is processed in
/// order, then at most one seek-back executes for the whole tick.
#[derive(Debug)]
pub struct PlaybackMachine<H> {
    config: MachineConfig,
    store: OffsetStore,
    host: H,
    state: PlaybackState,
    session: Option<PlaybackSession>,
    sessions_started: u64,
    event_seq: u64,
}

impl<H: PlayerHost> PlaybackMachine<H> {
    pub fn new(config: MachineConfig, store: OffsetStore, host: H) -> Self {
        Self {
            config,
            store,
            host,
            state: PlaybackState::Idle,
            session: None,
            sessions_started: 0,
            event_seq: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn store(&self) -> &OffsetStore {
        &self.store
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Handle a single event as its own tick
    pub fn handle_event(&mut self, event: PlayerEvent) {
        self.handle_tick(std::iter::once(event));
    }

    /// Handle every event of one tick, then settle the tick's seek-back
    pub fn handle_tick<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = PlayerEvent>,
    {
        for event in events {
            self.process(event);
        }
        self.close_tick();
    }

    fn process(&mut self, event: PlayerEvent) {
        self.event_seq += 1;
        debug!(
            "Event #{} {} in {:?}",
            self.event_seq,
            event.name(),
            self.state
        );

        match event {
            PlayerEvent::PlaybackStarted { stream } => self.on_playback_started(&stream),
            PlayerEvent::AudioStreamChanged { stream } => self.on_audio_stream_changed(&stream),
            PlayerEvent::Paused => self.on_paused(),
            PlayerEvent::Unpaused => self.on_unpaused(),
            PlayerEvent::ManualOffsetChanged { offset_ms } => {
                self.on_manual_offset(AudioOffset::from_millis(offset_ms))
            }
            PlayerEvent::Seeked | PlayerEvent::SpeedChanged => self.on_position_jump(),
            PlayerEvent::MonitoringChanged { enabled } => self.store.set_monitoring(enabled),
            PlayerEvent::PlaybackStopped | PlayerEvent::PlaybackEnded => self.on_stopped(),
        }
    }

    fn transition(&mut self, next: PlaybackState) {
        if self.state != next {
            debug!("State {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn on_playback_started(&mut self, stream: &StreamInfo) {
        if let Some(previous) = self.session.take() {
            info!("Session {} replaced by new playback", previous.id());
        }

        self.sessions_started += 1;
        self.session = Some(PlaybackSession::new(self.sessions_started));
        info!("Session {} started", self.sessions_started);
        self.transition(PlaybackState::Starting);

        self.transition(PlaybackState::Active);
        self.reclassify(stream);
        self.apply_offset();
        self.request_seek_back(SeekTrigger::PlaybackStart);
    }

    fn on_audio_stream_changed(&mut self, stream: &StreamInfo) {
        let Some(session) = self.session.as_mut() else {
            debug!("No session, ignoring audio stream change");
            return;
        };
        if session.take_stream_change_ignore() {
            debug!("Ignoring stream change announced after seek/speed change");
            return;
        }
        if self.state != PlaybackState::Active {
            debug!("Stream change in {:?}, deferred until active", self.state);
            session.defer_stream_change(stream.clone());
            return;
        }

        self.reclassify(stream);
        self.apply_offset();
        self.request_seek_back(SeekTrigger::AudioTrackChanged);
    }

    fn on_paused(&mut self) {
        if self.state == PlaybackState::Active {
            self.transition(PlaybackState::Paused);
        } else {
            debug!("Pause ignored in {:?}", self.state);
        }
    }

    fn on_unpaused(&mut self) {
        if self.state == PlaybackState::Paused {
            self.transition(PlaybackState::Active);
            let deferred = self
                .session
                .as_mut()
                .and_then(PlaybackSession::take_deferred_stream);
            if let Some(stream) = deferred {
                debug!("Resolving stream change received while paused");
                self.reclassify(&stream);
                self.apply_offset();
                self.request_seek_back(SeekTrigger::AudioTrackChanged);
            }
            self.request_seek_back(SeekTrigger::Unpaused);
        } else {
            debug!("Unpause ignored in {:?}", self.state);
        }
    }

    fn on_manual_offset(&mut self, offset: AudioOffset) {
        let monitoring = self.store.is_monitoring();
        let active = self.state == PlaybackState::Active;
        let Self {
            session,
            store,
            host,
            config,
            ..
        } = self;
        let Some(session) = session.as_mut() else {
            debug!("No session, ignoring manual offset {}", offset);
            return;
        };

        if session.applied_offset() == Some(offset) {
            debug!("Manual offset {} unchanged, ignoring", offset);
            return;
        }

        // The user's own change: track it, never re-apply it
        session.set_applied_offset(offset);

        if !active {
            debug!("Manual offset {} noted while not active, not learning", offset);
            return;
        }
        if !monitoring {
            debug!("Manual offset {} noted, monitoring off", offset);
            return;
        }
        let Some(sig) = session.signature() else {
            debug!("Session {} unclassified, not learning {}", session.id(), offset);
            return;
        };
        if !store.hdr_enabled(sig.hdr) {
            debug!("HDR type {} disabled, not learning {}", sig.hdr, offset);
            return;
        }

        if let Err(e) = store.record_learned(sig, offset) {
            warn!("Failed to record learned offset: {}", e);
            return;
        }
        send_notification(
            host,
            &config.notifications,
            &notify::offset_saved(offset, &sig),
        );

        self.request_seek_back(SeekTrigger::OffsetAdjusted);
    }

    fn on_position_jump(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.arm_stream_change_ignore();
        }
    }

    fn on_stopped(&mut self) {
        let Some(mut session) = self.session.take() else {
            debug!("No session, ignoring stop");
            return;
        };

        self.transition(PlaybackState::Stopped);
        let dropped = session.window_mut().discard();
        if dropped > 0 {
            debug!("Discarded {} pending seek-back candidate(s)", dropped);
        }
        info!("Session {} ended", session.id());
        self.transition(PlaybackState::Idle);
    }

    /// Re-derive the session signature; failure leaves it unclassified
    fn reclassify(&mut self, stream: &StreamInfo) {
        let Self {
            session, config, ..
        } = self;
        let Some(session) = session.as_mut() else {
            return;
        };

        match classify(stream, &config.classifier) {
            Ok(sig) => {
                if session.signature() != Some(sig) {
                    info!("Session {} signature: {} ({})", session.id(), sig, sig.label());
                }
                session.set_signature(Some(sig));
            }
            Err(e) => {
                warn!("Session {} unclassified: {}", session.id(), e);
                session.set_signature(None);
            }
        }
    }

    /// Resolve and apply the offset for the current signature, once
    fn apply_offset(&mut self) {
        let Self {
            session,
            store,
            host,
            config,
            ..
        } = self;
        let Some(session) = session.as_mut() else {
            return;
        };
        let Some(sig) = session.signature() else {
            debug!("Session {} unclassified, skipping offset", session.id());
            return;
        };
        if !store.hdr_enabled(sig.hdr) {
            debug!("HDR type {} disabled, skipping offset", sig.hdr);
            return;
        }

        let resolved = store.resolve(&sig);
        if session.applied_offset() == Some(resolved.offset) {
            debug!("Offset {} already applied for {}", resolved.offset, sig);
            return;
        }

        match host.set_audio_offset(resolved.offset) {
            Ok(()) => {
                session.set_applied_offset(resolved.offset);
                info!(
                    "Applied {:?} offset {} for {}",
                    resolved.provenance, resolved.offset, sig
                );
                send_notification(
                    host,
                    &config.notifications,
                    &notify::offset_applied(resolved.offset, &sig),
                );
            }
            Err(e) => warn!("Failed to apply offset {}: {}", resolved.offset, e),
        }
    }

    /// Add a seek-back candidate to the current tick
    fn request_seek_back(&mut self, trigger: SeekTrigger) {
        if self.state != PlaybackState::Active {
            debug!("No seek-back on {} in {:?}", trigger, self.state);
            return;
        }
        let Some(duration) = seek::decide(trigger, &self.config.seek_back) else {
            debug!("Seek-back on {} disabled", trigger);
            return;
        };

        let event_seq = self.event_seq;
        if let Some(session) = self.session.as_mut() {
            let request = SeekBackRequest::new(session.id(), event_seq, trigger, duration);
            session.window_mut().push(request);
        }
    }

    /// Execute at most one seek-back for the finished tick
    fn close_tick(&mut self) {
        let paused = self.state == PlaybackState::Paused;
        let Self { session, host, .. } = self;
        let Some(session) = session.as_mut() else {
            return;
        };

        if paused {
            let dropped = session.window_mut().discard();
            if dropped > 0 {
                debug!("Paused, dropped {} seek-back candidate(s)", dropped);
            }
            return;
        }

        let Some(request) = session.window_mut().close() else {
            return;
        };
        if session.already_fired(&request.key) {
            debug!("Seek-back {:?} already executed", request.key);
            return;
        }
        session.mark_fired(request.key);

        if request.duration.is_zero() {
            debug!("Zero-length seek-back on {}, nothing to issue", request.trigger);
            return;
        }

        match host.seek_relative(request.duration) {
            Ok(()) => {
                session.record_seek_back(request.trigger);
                info!(
                    "Seek-back {:.1}s on {}",
                    request.duration.as_secs_f64(),
                    request.trigger
                );
            }
            Err(e) => warn!("Seek-back on {} failed: {}", request.trigger, e),
        }
    }
}

fn send_notification<H: PlayerHost>(host: &mut H, config: &NotificationConfig, message: &str) {
    if !config.enabled {
        return;
    }
    if let Err(e) = host.notify(message, config.display_for) {
        warn!("Failed to send notification: {}", e);
    }
}
