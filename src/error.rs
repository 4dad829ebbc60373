//! Error types for the speech rendering core.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the relay channel. Both are fatal to the rest of an utterance.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No listener at the relay endpoint.
    #[error("relay channel unavailable at {endpoint}: {source}")]
    ChannelUnavailable {
        endpoint: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The message could not be written in full.
    #[error("relay write failed: {0}")]
    WriteFailed(String),
}

/// Failures while building the child environment block.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvBlockError {
    #[error("environment block needs {needed} units but capacity is {capacity}")]
    BufferOverflow { needed: usize, capacity: usize },

    #[error("current environment unavailable: {0}")]
    EnvironmentUnavailable(String),

    /// Text that cannot travel inside a NUL-terminated entry.
    #[error("text cannot be placed in the environment: {0}")]
    InvalidText(String),
}

/// Failures of one vocalization. Recoverable at fragment granularity.
#[derive(Debug, Error)]
pub enum VocalizeError {
    #[error("failed to spawn {executable}: {source}")]
    SpawnFailed {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("environment block needs {needed} units but capacity is {capacity}")]
    BufferOverflow { needed: usize, capacity: usize },

    #[error("current environment unavailable: {0}")]
    EnvironmentUnavailable(String),

    #[error("text cannot be placed in the environment: {0}")]
    InvalidText(String),
}

impl From<EnvBlockError> for VocalizeError {
    fn from(e: EnvBlockError) -> Self {
        match e {
            EnvBlockError::BufferOverflow { needed, capacity } => {
                Self::BufferOverflow { needed, capacity }
            }
            EnvBlockError::EnvironmentUnavailable(msg) => Self::EnvironmentUnavailable(msg),
            EnvBlockError::InvalidText(msg) => Self::InvalidText(msg),
        }
    }
}

/// Error returned by the host-facing `speak` entry point.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input from the host, rejected before any side effect.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Vocalize(#[from] VocalizeError),
}

/// Failure reported by the host when queried or called back.
#[derive(Debug, Error)]
#[error("host site error: {0}")]
pub struct SiteError(pub String);
