//! Input ports and their lifecycle states.

use serde::Serialize;

use crate::channel::ChannelFilter;

/// An input port the system reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InputPort {
    /// Stable identifier used to open and close the port.
    pub id: String,
    /// Human-readable name.
    pub name: String,
}

/// Connection state of a port, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// The device is gone.
    Disconnected,
    /// Opening, not yet delivering messages.
    Pending,
    /// Delivering messages.
    Open,
    /// Closed by us or by the device.
    Closed,
}

/// Whether the platform grants MIDI access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessState {
    /// No MIDI support on this platform.
    Unsupported,
    /// Supported, but access has not been requested.
    Unrequested,
    /// Access granted; ports can be listed and opened.
    Granted,
    /// Access was refused. Not retried automatically.
    Denied,
}

/// Connection phase of the active input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputConnection {
    /// Opening.
    Pending,
    /// Open; note messages are routed.
    Open,
}

/// The input the router is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveInput {
    /// Port id.
    pub id: String,
    /// Connection phase.
    pub connection: InputConnection,
    /// Channel filter in effect.
    pub channel: ChannelFilter,
}

impl ActiveInput {
    /// True once note messages from this input are routed.
    pub fn is_open(&self) -> bool {
        self.connection == InputConnection::Open
    }
}
