//! Offset tables, learned overrides and resolution

mod learned;
mod store;
mod tables;

pub use learned::LearnedFile;
pub use store::OffsetStore;
pub use tables::{parse_hashed_table, parse_table, Composition, OffsetTables};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Signed audio delay relative to video, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioOffset(i64);

impl AudioOffset {
    pub const ZERO: AudioOffset = AudioOffset(0);

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Offset in seconds, the unit most player APIs take
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl Add for AudioOffset {
    type Output = AudioOffset;

    fn add(self, rhs: AudioOffset) -> AudioOffset {
        AudioOffset(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for AudioOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0 {
            write!(f, "+{} ms", self.0)
        } else {
            write!(f, "{} ms", self.0)
        }
    }
}

/// Where a resolved offset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// User-set default from configuration
    Configured,
    /// Captured from a manual correction in monitoring mode
    Learned,
    /// Nothing configured, zero offset
    Default,
}

/// Result of resolving a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOffset {
    pub offset: AudioOffset,
    pub provenance: Provenance,
}
