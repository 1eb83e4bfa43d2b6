//! Platform MIDI input via `midir`.
//!
//! Ports are identified by name. When several ports share a name the later
//! ones get a ` #2`, ` #3`, ... suffix in enumeration order. midir has no
//! hot-plug notification, so callers poll
//! [`MidiRouter::refresh_ports`](crate::MidiRouter::refresh_ports).

use std::collections::HashMap;

use crossbeam_channel::Sender;
use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};

use crate::backend::{MidiBackend, PortEvent};
use crate::error::MidiError;
use crate::port::{ConnectionState, InputPort};

struct OpenPort {
    connection: MidiInputConnection<()>,
    events: Sender<PortEvent>,
}

/// [`MidiBackend`] over the system MIDI API.
pub struct MidirBackend {
    client_name: String,
    scanner: Option<MidiInput>,
    connections: HashMap<String, OpenPort>,
}

impl MidirBackend {
    /// Creates a backend whose connections appear under `client_name`.
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            scanner: None,
            connections: HashMap::new(),
        }
    }

    fn scanner(&mut self) -> Result<&MidiInput, MidiError> {
        if self.scanner.is_none() {
            let input = MidiInput::new(&format!("{} scanner", self.client_name))
                .map_err(|e| MidiError::AccessDenied(e.to_string()))?;
            self.scanner = Some(input);
        }
        self.scanner.as_ref().ok_or(MidiError::InputsUnavailable)
    }

    fn find_port(input: &MidiInput, id: &str) -> Option<MidiInputPort> {
        let ports = input.ports();
        let names = ports.iter().map(|p| input.port_name(p).unwrap_or_default());
        let ids = unique_ids(names);
        ports.into_iter().zip(ids).find(|(_, pid)| pid == id).map(|(p, _)| p)
    }
}

impl std::fmt::Debug for MidirBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidirBackend")
            .field("client_name", &self.client_name)
            .field("open", &self.connections.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Turns port names into ids, suffixing duplicates.
fn unique_ids(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                name
            } else {
                format!("{name} #{count}")
            }
        })
        .collect()
}

impl MidiBackend for MidirBackend {
    fn is_supported(&self) -> bool {
        true
    }

    fn request_access(&mut self) -> Result<(), MidiError> {
        self.scanner().map(|_| ())
    }

    fn ports(&mut self) -> Result<Vec<InputPort>, MidiError> {
        let input = self.scanner()?;
        let names: Vec<String> = input
            .ports()
            .iter()
            .map(|p| input.port_name(p).unwrap_or_default())
            .collect();
        let ids = unique_ids(names.iter().cloned());
        Ok(ids
            .into_iter()
            .zip(names)
            .map(|(id, name)| InputPort { id, name })
            .collect())
    }

    fn open(&mut self, id: &str, events: Sender<PortEvent>) -> Result<(), MidiError> {
        if self.connections.contains_key(id) {
            return Ok(());
        }
        let mut input = MidiInput::new(&self.client_name)
            .map_err(|e| MidiError::Connect(e.to_string()))?;
        let port = Self::find_port(&input, id).ok_or_else(|| MidiError::PortNotFound(id.to_string()))?;

        let _ = events.send(PortEvent::StateChanged {
            id: id.to_string(),
            state: ConnectionState::Pending,
        });

        input.ignore(Ignore::All);
        let tx = events.clone();
        let port_id = id.to_string();
        let connected = input.connect(
            &port,
            "tessitura-input",
            move |_timestamp_us, message, ()| {
                let _ = tx.send(PortEvent::Message {
                    id: port_id.clone(),
                    bytes: message.to_vec(),
                });
            },
            (),
        );

        match connected {
            Ok(connection) => {
                tracing::info!(port = id, "MIDI input connected");
                let _ = events.send(PortEvent::StateChanged {
                    id: id.to_string(),
                    state: ConnectionState::Open,
                });
                self.connections
                    .insert(id.to_string(), OpenPort { connection, events });
                Ok(())
            }
            Err(e) => {
                let _ = events.send(PortEvent::StateChanged {
                    id: id.to_string(),
                    state: ConnectionState::Closed,
                });
                Err(MidiError::Connect(e.to_string()))
            }
        }
    }

    fn close(&mut self, id: &str) -> Result<(), MidiError> {
        let open = self
            .connections
            .remove(id)
            .ok_or_else(|| MidiError::NotActive(id.to_string()))?;
        open.connection.close();
        tracing::info!(port = id, "MIDI input closed");
        let _ = open.events.send(PortEvent::StateChanged {
            id: id.to_string(),
            state: ConnectionState::Closed,
        });
        Ok(())
    }
}
