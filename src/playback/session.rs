//! Per-item playback session state

use crate::offset::AudioOffset;
use crate::seek::{CoalescingWindow, IdempotenceKey, SeekTrigger};
use crate::stream::{Signature, StreamInfo};
use std::collections::HashMap;
use std::time::Instant;

/// One media item being played
///
/// Owned by the state machine from playback start to stop.
#[derive(Debug)]
pub struct PlaybackSession {
    id: u64,
    signature: Option<Signature>,
    applied_offset: Option<AudioOffset>,
    last_offset_at: Option<Instant>,
    /// Seek-back candidates of the current tick
    window: CoalescingWindow,
    last_seek_back: HashMap<SeekTrigger, Instant>,
    last_fired: Option<IdempotenceKey>,
    /// Set after a host seek or speed change, cleared by the next stream change
    ignore_next_stream_change: bool,
    /// Newest stream change received while paused, classified on unpause
    deferred_stream: Option<StreamInfo>,
}

impl PlaybackSession {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            signature: None,
            applied_offset: None,
            last_offset_at: None,
            window: CoalescingWindow::default(),
            last_seek_back: HashMap::new(),
            last_fired: None,
            ignore_next_stream_change: false,
            deferred_stream: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current signature, `None` while unclassified
    pub fn signature(&self) -> Option<Signature> {
        self.signature
    }

    pub fn is_classified(&self) -> bool {
        self.signature.is_some()
    }

    pub fn set_signature(&mut self, signature: Option<Signature>) {
        self.signature = signature;
    }

    /// Offset currently in effect on the player, as far as we know
    pub fn applied_offset(&self) -> Option<AudioOffset> {
        self.applied_offset
    }

    pub fn set_applied_offset(&mut self, offset: AudioOffset) {
        self.applied_offset = Some(offset);
        self.last_offset_at = Some(Instant::now());
    }

    pub fn last_offset_at(&self) -> Option<Instant> {
        self.last_offset_at
    }

    pub fn window_mut(&mut self) -> &mut CoalescingWindow {
        &mut self.window
    }

    /// Whether a request with this key already executed
    pub fn already_fired(&self, key: &IdempotenceKey) -> bool {
        self.last_fired.as_ref() == Some(key)
    }

    pub fn mark_fired(&mut self, key: IdempotenceKey) {
        self.last_fired = Some(key);
    }

    pub fn record_seek_back(&mut self, trigger: SeekTrigger) {
        self.last_seek_back.insert(trigger, Instant::now());
    }

    pub fn last_seek_back(&self, trigger: SeekTrigger) -> Option<Instant> {
        self.last_seek_back.get(&trigger).copied()
    }

    pub fn arm_stream_change_ignore(&mut self) {
        self.ignore_next_stream_change = true;
    }

    /// Consume the one-shot ignore flag
    pub fn take_stream_change_ignore(&mut self) -> bool {
        std::mem::take(&mut self.ignore_next_stream_change)
    }

    /// Keep a stream change for later; a newer one replaces it
    pub fn defer_stream_change(&mut self, stream: StreamInfo) {
        self.deferred_stream = Some(stream);
    }

    /// Whether the signature may be out of date with the playing streams
    pub fn is_stale(&self) -> bool {
        self.deferred_stream.is_some()
    }

    pub fn take_deferred_stream(&mut self) -> Option<StreamInfo> {
        self.deferred_stream.take()
    }
}
