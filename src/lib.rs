//! avoffset - Automatic audio offset manager
//!
//! Classifies the playing content by HDR type, audio format and frame
//! rate, applies the matching audio offset to the host player, learns
//! manual corrections and rewinds after offset changes.

pub mod config;
pub mod error;
pub mod offset;
pub mod playback;
pub mod seek;
pub mod stream;

pub use error::{AvOffsetError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
