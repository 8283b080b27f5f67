//! Error types for terminal and signal operations

use nix::sys::signal::Signal;
use thiserror::Error;

/// Broad classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A system call failed; `Error::errno` has the code
    Os,
    /// The API was misused or the OS reported something unexpected
    Logical,
}

/// Terminal control error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to get terminal attributes: {0}")]
    GetAttributes(#[source] nix::Error),

    #[error("Failed to set terminal attributes: {0}")]
    SetAttributes(#[source] nix::Error),

    #[error("Failed to restore terminal attributes: {0}")]
    RestoreAttributes(#[source] nix::Error),

    #[error("Failed to get window size: {0}")]
    WindowSize(#[source] nix::Error),

    #[error("Failed to change signal mask: {0}")]
    SignalMask(#[source] nix::Error),

    #[error("Failed to wait for signal: {0}")]
    SignalWait(#[source] nix::Error),

    /// `offset` bytes were queued before the failure and stay queued
    #[error("Failed to inject input at byte {offset}: {source}")]
    InjectInput {
        offset: usize,
        #[source]
        source: nix::Error,
    },

    #[error("restore called before the terminal was prepared")]
    NotPrepared,

    #[error("Caught signal other than SIGINT: {0}")]
    UnexpectedSignal(Signal),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error came from a system call or from API misuse
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::GetAttributes(_)
            | Error::SetAttributes(_)
            | Error::RestoreAttributes(_)
            | Error::WindowSize(_)
            | Error::SignalMask(_)
            | Error::SignalWait(_)
            | Error::InjectInput { .. } => ErrorKind::Os,
            Error::NotPrepared | Error::UnexpectedSignal(_) | Error::Config(_) => {
                ErrorKind::Logical
            },
        }
    }

    /// The OS error code, for `ErrorKind::Os` errors
    pub fn errno(&self) -> Option<nix::Error> {
        match self {
            Error::GetAttributes(e)
            | Error::SetAttributes(e)
            | Error::RestoreAttributes(e)
            | Error::WindowSize(e)
            | Error::SignalMask(e)
            | Error::SignalWait(e) => Some(*e),
            Error::InjectInput { source, .. } => Some(*source),
            _ => None,
        }
    }
}

/// Result type for terminal control operations
pub type Result<T> = std::result::Result<T, Error>;
