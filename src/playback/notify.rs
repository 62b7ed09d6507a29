//! On-screen notification messages

use crate::offset::AudioOffset;
use crate::stream::Signature;
use std::time::Duration;

/// Notification settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub display_for: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            display_for: Duration::from_secs(5),
        }
    }
}

/// Message shown after an offset was applied to the player
pub fn offset_applied(offset: AudioOffset, sig: &Signature) -> String {
    format!("Offset applied: {}\n{}", offset, sig.label())
}

/// Message shown after a manual correction was stored
pub fn offset_saved(offset: AudioOffset, sig: &Signature) -> String {
    format!("Offset saved: {}\n{}", offset, sig.label())
}
