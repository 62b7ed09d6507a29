//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// avoffset - Automatic audio offset manager
///
/// Applies per-stream audio offsets, learns manual corrections and
/// rewinds after offset changes
#[derive(Parser, Debug)]
#[command(name = "avoffset")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbose output (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode - only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output to file
    #[arg(long, global = true)]
    pub log: Option<String>,

    /// Configuration file (default: ./avoffset.toml, then the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Feed a recorded event script through the playback service
    Replay {
        /// TOML script with one [[tick]] block per tick
        script: PathBuf,
    },

    /// Classify stream metadata and show the offset that would be applied
    Resolve {
        /// Dynamic range label (e.g. dolbyvision, hdr10, sdr)
        #[arg(long, default_value = "sdr")]
        hdr: String,

        /// Audio codec (e.g. truehd, eac3, dtshd_ma)
        #[arg(long)]
        audio: String,

        /// Audio channel count
        #[arg(long)]
        channels: Option<u32>,

        /// Stream carries Dolby Atmos
        #[arg(long)]
        atmos: bool,

        /// Frame rate
        #[arg(long)]
        fps: Option<f64>,
    },

    /// Inspect or clear learned offsets
    Learned {
        #[command(subcommand)]
        action: LearnedAction,
    },

    /// Print a sample configuration or check the active one
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum LearnedAction {
    /// List learned offsets
    List,

    /// Clear one learned offset, or all of them
    Clear {
        /// Signature key (e.g. dolbyvision_23.98_truehd)
        signature: Option<String>,
    },
}

#[derive(Subcommand, Debug, Default)]
pub enum ConfigAction {
    /// Print a sample configuration file
    Sample,

    /// Validate the active configuration
    #[default]
    Check,
}

impl Args {
    /// Get the log level based on verbose/quiet flags, `None` when neither is given
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.quiet {
            Some(tracing::Level::ERROR)
        } else {
            match self.verbose {
                0 => None,
                1 => Some(tracing::Level::DEBUG),
                _ => Some(tracing::Level::TRACE),
            }
        }
    }
}

impl Default for Command {
    fn default() -> Self {
        Command::Config {
            action: ConfigAction::default(),
        }
    }
}
