//! Backend abstraction for platform MIDI input.
//!
//! A backend lists ports and opens connections. Everything it learns
//! afterwards (state transitions, incoming bytes, hot-plug) arrives as
//! [`PortEvent`]s on the channel the router hands it, so that driver
//! callbacks never touch router state directly.

use crossbeam_channel::Sender;

use crate::error::MidiError;
use crate::port::{ConnectionState, InputPort};

/// Something that happened on the MIDI side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortEvent {
    /// A port changed connection state.
    StateChanged {
        /// Port id.
        id: String,
        /// New state.
        state: ConnectionState,
    },
    /// Raw bytes received on an open port.
    Message {
        /// Port id.
        id: String,
        /// Message bytes, status first.
        bytes: Vec<u8>,
    },
    /// The set of available ports changed.
    PortsChanged,
}

/// Platform MIDI input.
pub trait MidiBackend {
    /// Whether this platform supports MIDI input at all.
    fn is_supported(&self) -> bool;

    /// Asks the platform for access.
    fn request_access(&mut self) -> Result<(), MidiError>;

    /// Lists ports currently available.
    fn ports(&mut self) -> Result<Vec<InputPort>, MidiError>;

    /// Registers the channel for [`PortEvent::PortsChanged`] notifications.
    ///
    /// Backends without hot-plug notifications ignore it; the router then
    /// relies on polling [`MidiRouter::refresh_ports`](crate::MidiRouter::refresh_ports).
    fn watch(&mut self, events: Sender<PortEvent>) {
        let _ = events;
    }

    /// Opens a port. The backend reports `Pending` and then `Open` (or
    /// `Closed` on failure) through `events`, followed by `Message`s.
    fn open(&mut self, id: &str, events: Sender<PortEvent>) -> Result<(), MidiError>;

    /// Closes a port and reports `Closed`.
    fn close(&mut self, id: &str) -> Result<(), MidiError>;
}
