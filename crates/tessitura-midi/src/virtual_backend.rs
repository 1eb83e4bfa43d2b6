//! In-process MIDI backend.
//!
//! Ports are plugged and unplugged by hand and bytes are injected with
//! [`VirtualMidiBackend::send`]. Clones share state, so a test (or the
//! offline renderer) keeps one handle while the router owns another.

use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::backend::{MidiBackend, PortEvent};
use crate::error::MidiError;
use crate::port::{ConnectionState, InputPort};

#[derive(Debug, Default)]
struct State {
    ports: BTreeMap<String, String>,
    open: BTreeMap<String, Sender<PortEvent>>,
    watchers: Vec<Sender<PortEvent>>,
    granted: bool,
}

#[derive(Debug, Clone)]
enum Access {
    Allow,
    Deny(String),
    Unsupported,
}

/// [`MidiBackend`] with hand-driven ports.
#[derive(Debug, Clone)]
pub struct VirtualMidiBackend {
    access: Access,
    state: Arc<Mutex<State>>,
}

impl Default for VirtualMidiBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualMidiBackend {
    /// Backend that grants access and has no ports.
    pub fn new() -> Self {
        Self {
            access: Access::Allow,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Backend reporting no MIDI support.
    pub fn unsupported() -> Self {
        Self {
            access: Access::Unsupported,
            ..Self::new()
        }
    }

    /// Backend that refuses access with `reason`.
    pub fn denying(reason: impl Into<String>) -> Self {
        Self {
            access: Access::Deny(reason.into()),
            ..Self::new()
        }
    }

    /// Adds a port and notifies watchers.
    pub fn plug(&self, id: impl Into<String>, name: impl Into<String>) {
        let mut state = self.state.lock();
        state.ports.insert(id.into(), name.into());
        notify(&mut state.watchers, &PortEvent::PortsChanged);
    }

    /// Removes a port. An open connection on it reports `Disconnected`.
    pub fn unplug(&self, id: &str) {
        let mut state = self.state.lock();
        state.ports.remove(id);
        if let Some(tx) = state.open.remove(id) {
            let _ = tx.send(PortEvent::StateChanged {
                id: id.to_string(),
                state: ConnectionState::Disconnected,
            });
        }
        notify(&mut state.watchers, &PortEvent::PortsChanged);
    }

    /// Delivers raw bytes from port `id`. Returns false if it is not open.
    pub fn send(&self, id: &str, bytes: &[u8]) -> bool {
        let state = self.state.lock();
        state.open.get(id).is_some_and(|tx| {
            tx.send(PortEvent::Message {
                id: id.to_string(),
                bytes: bytes.to_vec(),
            })
            .is_ok()
        })
    }

    /// True if port `id` is currently open.
    pub fn is_open(&self, id: &str) -> bool {
        self.state.lock().open.contains_key(id)
    }
}

fn notify(watchers: &mut Vec<Sender<PortEvent>>, event: &PortEvent) {
    watchers.retain(|tx| tx.send(event.clone()).is_ok());
}

impl MidiBackend for VirtualMidiBackend {
    fn is_supported(&self) -> bool {
        !matches!(self.access, Access::Unsupported)
    }

    fn request_access(&mut self) -> Result<(), MidiError> {
        match &self.access {
            Access::Allow => {
                self.state.lock().granted = true;
                Ok(())
            }
            Access::Deny(reason) => Err(MidiError::AccessDenied(reason.clone())),
            Access::Unsupported => Err(MidiError::Unsupported),
        }
    }

    fn ports(&mut self) -> Result<Vec<InputPort>, MidiError> {
        let state = self.state.lock();
        if !state.granted {
            return Err(MidiError::InputsUnavailable);
        }
        Ok(state
            .ports
            .iter()
            .map(|(id, name)| InputPort {
                id: id.clone(),
                name: name.clone(),
            })
            .collect())
    }

    fn watch(&mut self, events: Sender<PortEvent>) {
        self.state.lock().watchers.push(events);
    }

    fn open(&mut self, id: &str, events: Sender<PortEvent>) -> Result<(), MidiError> {
        let mut state = self.state.lock();
        if !state.ports.contains_key(id) {
            return Err(MidiError::PortNotFound(id.to_string()));
        }
        for connection in [ConnectionState::Pending, ConnectionState::Open] {
            let _ = events.send(PortEvent::StateChanged {
                id: id.to_string(),
                state: connection,
            });
        }
        state.open.insert(id.to_string(), events);
        Ok(())
    }

    fn close(&mut self, id: &str) -> Result<(), MidiError> {
        let tx = self
            .state
            .lock()
            .open
            .remove(id)
            .ok_or_else(|| MidiError::NotActive(id.to_string()))?;
        let _ = tx.send(PortEvent::StateChanged {
            id: id.to_string(),
            state: ConnectionState::Closed,
        });
        Ok(())
    }
}
