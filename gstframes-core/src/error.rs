// ============================================================================
// gstframes-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error Types for the gstframes Core Library
//
// This module defines the single error enum used across the core library and
// a handful of constructor helpers that keep error creation uniform at the
// call sites that spawn and wait on the pipeline subprocess.
//
// KEY COMPONENTS:
// - CoreError: every failure the library can surface
// - CoreResult: result alias used by all public operations
// - command_*_error helpers for subprocess failures

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors surfaced by the gstframes core library.
///
/// Parsing a single trace line never produces an error; only the terminal
/// conditions of a pipeline run end up here. A consumer stopping the stream
/// on purpose is reported as [`crate::StreamEnd::Stopped`], not as an error.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Required dependency '{0}' not found")]
    DependencyNotFound(String),

    #[error("Dependency check for '{command}' failed: {reason}")]
    DependencyCheckFailed { command: String, reason: String },

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, #[source] io::Error),

    #[error("Failed waiting for command '{0}': {1}")]
    CommandWait(String, #[source] io::Error),

    #[error("Command '{command}' failed with status {status}: {message}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse configuration file: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Sink is not attached to a pipeline")]
    NotBound,

    #[error("Caps discovery failed for stage '{stage}': {reason}")]
    CapsDiscovery { stage: String, reason: String },

    #[error("Caps for stage '{stage}' not discovered within {seconds:.1}s")]
    CapsDiscoveryTimeout { stage: String, seconds: f64 },

    #[error("Unsupported pixel format '{0}'")]
    UnsupportedFormat(String),

    #[error("Side channel read failed after {bytes_read} bytes of the current frame: {source}")]
    SideChannelRead {
        bytes_read: usize,
        #[source]
        source: io::Error,
    },

    #[error("Frame consumer failed: {0}")]
    Consumer(#[source] anyhow::Error),
}

/// Result type for gstframes core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Builds a [`CoreError::CommandStart`] for the named command.
pub fn command_start_error(command: &str, err: io::Error) -> CoreError {
    CoreError::CommandStart(command.to_string(), err)
}

/// Builds a [`CoreError::CommandWait`] for the named command.
pub fn command_wait_error(command: &str, err: io::Error) -> CoreError {
    CoreError::CommandWait(command.to_string(), err)
}

/// Builds a [`CoreError::CommandFailed`] for the named command.
pub fn command_failed_error(
    command: &str,
    status: ExitStatus,
    message: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        command: command.to_string(),
        status,
        message: message.into(),
    }
}

/// Builds a [`CoreError::CapsDiscovery`] for the named trigger stage.
pub fn caps_discovery_error(stage: &str, reason: impl Into<String>) -> CoreError {
    CoreError::CapsDiscovery {
        stage: stage.to_string(),
        reason: reason.into(),
    }
}
