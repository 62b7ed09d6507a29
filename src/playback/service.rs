//! Background event service: a single worker thread owns the playback
//! machine and processes host events in ticks

use crate::error::{AvOffsetError, Result};
use crate::playback::event::PlayerEvent;
use crate::playback::host::PlayerHost;
use crate::playback::machine::PlaybackMachine;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Queue depth between host callbacks and the worker
const EVENT_QUEUE_DEPTH: usize = 256;

/// Messages sent to the worker thread
#[derive(Debug, Clone)]
pub enum ServiceMessage {
    /// Single event; events queued behind it join the same tick
    Event(PlayerEvent),
    /// Explicit tick boundary carrying its events
    Tick(Vec<PlayerEvent>),
    Shutdown,
}

/// Service state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Running,
    ShuttingDown,
}

/// Clonable handle for delivering events from host callbacks
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<ServiceMessage>,
}

impl EventSender {
    pub fn send(&self, event: PlayerEvent) -> Result<()> {
        self.deliver(ServiceMessage::Event(event))
    }

    pub fn send_tick(&self, events: Vec<PlayerEvent>) -> Result<()> {
        self.deliver(ServiceMessage::Tick(events))
    }

    fn deliver(&self, message: ServiceMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|e| AvOffsetError::Channel(format!("event service stopped: {}", e)))
    }
}

/// Runs a [`PlaybackMachine`] on its own thread
pub struct EventService<H> {
    state: Arc<Mutex<ServiceState>>,
    tx: Option<Sender<ServiceMessage>>,
    handle: Option<JoinHandle<PlaybackMachine<H>>>,
}

impl<H> Default for EventService<H> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(ServiceState::Stopped)),
            tx: None,
            handle: None,
        }
    }
}

impl<H: PlayerHost + Send + 'static> EventService<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ServiceState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServiceState::Running
    }

    /// Move the machine onto a worker thread and start processing events
    pub fn start(&mut self, machine: PlaybackMachine<H>) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != ServiceState::Stopped {
                return Err(AvOffsetError::AlreadyRunning);
            }
            *state = ServiceState::Running;
        }

        let (tx, rx) = bounded::<ServiceMessage>(EVENT_QUEUE_DEPTH);
        let state = Arc::clone(&self.state);
        self.handle = Some(thread::spawn(move || {
            let machine = run_loop(machine, &rx);
            *state.lock() = ServiceState::Stopped;
            machine
        }));
        self.tx = Some(tx);

        info!("Event service started");
        Ok(())
    }

    /// Handle for host callbacks; fails once the service is stopped
    pub fn sender(&self) -> Result<EventSender> {
        self.tx
            .clone()
            .map(|tx| EventSender { tx })
            .ok_or_else(|| AvOffsetError::Channel("event service not running".into()))
    }

    pub fn send(&self, event: PlayerEvent) -> Result<()> {
        self.sender()?.send(event)
    }

    pub fn send_tick(&self, events: Vec<PlayerEvent>) -> Result<()> {
        self.sender()?.send_tick(events)
    }

    /// Stop the worker after it drains queued events, handing the machine back
    pub fn stop(&mut self) -> Result<PlaybackMachine<H>> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| AvOffsetError::Channel("event service not running".into()))?;

        *self.state.lock() = ServiceState::ShuttingDown;
        info!("Stopping event service...");

        if let Some(tx) = self.tx.take() {
            let _ = tx.send(ServiceMessage::Shutdown);
        }

        let machine = handle
            .join()
            .map_err(|_| AvOffsetError::Channel("event worker panicked".into()));
        *self.state.lock() = ServiceState::Stopped;
        info!("Event service stopped");
        machine
    }
}

impl<H> Drop for EventService<H> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(ServiceMessage::Shutdown);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Worker loop: one blocking receive plus whatever is already queued forms a tick
fn run_loop<H: PlayerHost>(
    mut machine: PlaybackMachine<H>,
    rx: &Receiver<ServiceMessage>,
) -> PlaybackMachine<H> {
    let mut carry: Option<ServiceMessage> = None;

    loop {
        let message = match carry.take() {
            Some(message) => message,
            None => match rx.recv() {
                Ok(message) => message,
                Err(_) => {
                    info!("Event channel disconnected");
                    break;
                }
            },
        };

        match message {
            ServiceMessage::Event(first) => {
                let mut events = vec![first];
                while let Ok(next) = rx.try_recv() {
                    match next {
                        ServiceMessage::Event(event) => events.push(event),
                        other => {
                            carry = Some(other);
                            break;
                        }
                    }
                }
                debug!("Tick with {} event(s)", events.len());
                machine.handle_tick(events);
            }
            ServiceMessage::Tick(events) => {
                debug!("Explicit tick with {} event(s)", events.len());
                machine.handle_tick(events);
            }
            ServiceMessage::Shutdown => break,
        }
    }

    if machine.session().is_some() {
        warn!("Event service stopping with an active session");
    }
    machine
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset::{AudioOffset, OffsetStore, OffsetTables};
    use crate::playback::host::RecordingHost;
    use crate::playback::machine::{MachineConfig, PlaybackState};
    use crate::seek::{SeekBackConfig, TriggerSetting};
    use crate::stream::{AudioFormat, AudioStreamInfo, StreamInfo, VideoStreamInfo};
    use std::time::Duration;

    fn machine() -> PlaybackMachine<RecordingHost> {
        let mut tables = OffsetTables::default();
        tables
            .audio
            .insert(AudioFormat::AtmosTrueHd, AudioOffset::from_millis(30));
        PlaybackMachine::new(
            MachineConfig::default(),
            OffsetStore::new(tables, false),
            RecordingHost::default(),
        )
    }

    fn truehd() -> StreamInfo {
        StreamInfo {
            video: Some(VideoStreamInfo {
                hdr_type: "sdr".into(),
                fps: Some(24.0),
                gamut: None,
            }),
            audio: Some(AudioStreamInfo {
                codec: "truehd".into(),
                channels: Some(8),
                atmos: true,
            }),
        }
    }

    #[test]
    fn test_events_reach_machine() {
        let mut service = EventService::new();
        service.start(machine()).unwrap();
        assert!(service.is_running());

        let sender = service.sender().unwrap();
        sender
            .send(PlayerEvent::PlaybackStarted { stream: truehd() })
            .unwrap();
        sender.send_tick(vec![PlayerEvent::Paused]).unwrap();

        let machine = service.stop().unwrap();
        assert_eq!(service.state(), ServiceState::Stopped);
        assert_eq!(machine.state(), PlaybackState::Paused);
        assert_eq!(
            machine.host().offsets(),
            vec![AudioOffset::from_millis(30)]
        );

        assert!(sender.send(PlayerEvent::Unpaused).is_err());
    }

    fn seeking_machine() -> PlaybackMachine<RecordingHost> {
        let config = MachineConfig {
            seek_back: SeekBackConfig {
                playback_start: TriggerSetting::enabled(Duration::from_secs(5)),
                audio_track_changed: TriggerSetting::enabled(Duration::from_secs(3)),
                ..Default::default()
            },
            ..Default::default()
        };
        PlaybackMachine::new(
            config,
            OffsetStore::new(OffsetTables::default(), false),
            RecordingHost::default(),
        )
    }

    #[test]
    fn test_queued_events_share_a_tick() {
        let (tx, rx) = bounded(8);
        let mut eac3 = truehd();
        if let Some(audio) = eac3.audio.as_mut() {
            audio.codec = "eac3".into();
            audio.atmos = false;
        }
        tx.send(ServiceMessage::Event(PlayerEvent::PlaybackStarted {
            stream: truehd(),
        }))
        .unwrap();
        tx.send(ServiceMessage::Event(PlayerEvent::AudioStreamChanged {
            stream: eac3,
        }))
        .unwrap();
        tx.send(ServiceMessage::Shutdown).unwrap();
        // Queued after the shutdown, never processed
        tx.send(ServiceMessage::Event(PlayerEvent::Paused)).unwrap();

        let machine = run_loop(seeking_machine(), &rx);
        assert_eq!(machine.host().seeks(), vec![Duration::from_secs(3)]);
        assert_eq!(machine.state(), PlaybackState::Active);
    }

    #[test]
    fn test_explicit_tick_is_not_merged() {
        let (tx, rx) = bounded(8);
        tx.send(ServiceMessage::Event(PlayerEvent::PlaybackStarted {
            stream: truehd(),
        }))
        .unwrap();
        tx.send(ServiceMessage::Tick(vec![PlayerEvent::AudioStreamChanged {
            stream: truehd(),
        }]))
        .unwrap();
        drop(tx);

        let machine = run_loop(seeking_machine(), &rx);
        assert_eq!(
            machine.host().seeks(),
            vec![Duration::from_secs(5), Duration::from_secs(3)]
        );
    }

    #[test]
    fn test_start_twice_fails() {
        let mut service = EventService::new();
        service.start(machine()).unwrap();
        assert!(matches!(
            service.start(machine()),
            Err(AvOffsetError::AlreadyRunning)
        ));
        service.stop().unwrap();

        // Restart after stop
        service.start(machine()).unwrap();
        service.stop().unwrap();
    }

    #[test]
    fn test_stop_without_start() {
        let mut service: EventService<RecordingHost> = EventService::new();
        assert!(service.stop().is_err());
        assert!(service.sender().is_err());
    }
}
