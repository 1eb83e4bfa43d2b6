//! MIDI error types.

use thiserror::Error;

/// Errors from the MIDI router and its backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MidiError {
    /// The platform has no MIDI support.
    #[error("MIDI is not supported on this platform")]
    Unsupported,

    /// Access was already requested (granted or denied).
    #[error("MIDI access has already been requested")]
    AlreadyRequested,

    /// The platform refused access.
    #[error("MIDI access denied: {0}")]
    AccessDenied(String),

    /// Ports cannot be listed or opened before access is granted.
    #[error("MIDI inputs are not available until access is granted")]
    InputsUnavailable,

    /// No input with this id exists.
    #[error("MIDI input '{0}' not found")]
    PortNotFound(String),

    /// The input is not the active one.
    #[error("MIDI input '{0}' is not active")]
    NotActive(String),

    /// The driver failed to connect.
    #[error("failed to connect MIDI input: {0}")]
    Connect(String),
}

/// Result alias for MIDI operations.
pub type Result<T> = std::result::Result<T, MidiError>;
