//! Unified error types for avoffset

use thiserror::Error;

/// Main error type for avoffset operations
#[derive(Error, Debug)]
pub enum AvOffsetError {
    /// Mandatory stream metadata is missing, the session stays unclassified
    #[error("Cannot classify stream: {0}")]
    Classification(String),

    /// The host player rejected or failed a command
    #[error("Host command '{command}' failed: {message}")]
    HostCommand { command: String, message: String },

    /// Malformed offset table or duration value
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Learned offsets can only be recorded while monitoring is enabled
    #[error("Monitoring mode is not active")]
    MonitoringInactive,

    /// Reading or writing the learned offset table failed
    #[error("Persistence error at '{path}': {message}")]
    Persistence { path: String, message: String },

    /// Event service already running
    #[error("Event service already running")]
    AlreadyRunning,

    /// Thread communication error
    #[error("Thread communication error: {0}")]
    Channel(String),
}

/// Result type alias for avoffset operations
pub type Result<T> = std::result::Result<T, AvOffsetError>;

impl AvOffsetError {
    /// Create a host command error with context
    pub fn host_command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HostCommand {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a persistence error with context
    pub fn persistence(path: impl std::fmt::Debug, message: impl ToString) -> Self {
        Self::Persistence {
            path: format!("{:?}", path),
            message: message.to_string(),
        }
    }

    /// Check if this error is recoverable (playback continues, next event is processed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AvOffsetError::Classification(_)
                | AvOffsetError::HostCommand { .. }
                | AvOffsetError::Configuration(_)
                | AvOffsetError::Persistence { .. }
        )
    }
}
