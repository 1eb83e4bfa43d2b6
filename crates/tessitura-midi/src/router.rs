//! MIDI router: port lifecycle, channel filtering and note dispatch.
//!
//! ```text
//!  backend callback ──PortEvent──▶ events channel ──▶ handle_event
//!                                                       │
//!   on-screen keys ─── play_note_on / stop_note ──┐     │ Message
//!                                                 ▼     ▼
//!                                       handle_note ◀── decode + channel filter
//!                                            │
//!                            FrequencyTable ─┤── NotePlayer::start_note / stop_note
//!                                            └── note_ons / note_offs
//! ```
//!
//! All state lives on the control thread. Driver callbacks only push
//! [`PortEvent`]s; whoever owns the router drains them with
//! [`MidiRouter::process_pending_events`] or a `select!` on
//! [`MidiRouter::events`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use tessitura_core::{Broadcast, Mapping, Subscription, TuningData, Watch};
use tessitura_synth::NotePlayer;

use crate::backend::{MidiBackend, PortEvent};
use crate::channel::ChannelFilter;
use crate::error::{MidiError, Result};
use crate::message::{self, NoteCommand};
use crate::port::{AccessState, ActiveInput, ConnectionState, InputConnection, InputPort};

/// Where a note request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSource {
    /// A physical input, on this wire channel.
    Midi {
        /// Channel index, 0..=15.
        channel: u8,
    },
    /// The on-screen keyboard or another in-process caller.
    Virtual,
}

/// Router settings, usually the `[midi]` table of the player config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Open an input as soon as access is granted.
    pub auto_open: bool,
    /// Channel filter.
    pub channel: ChannelFilter,
    /// Port to auto-open: an exact id or a substring of the name.
    /// The first port when unset.
    #[serde(rename = "port", skip_serializing_if = "Option::is_none")]
    pub preferred_port: Option<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            auto_open: true,
            channel: ChannelFilter::Omni,
            preferred_port: None,
        }
    }
}

/// Routes MIDI and on-screen key presses to a [`NotePlayer`].
pub struct MidiRouter<P: NotePlayer, B: MidiBackend> {
    player: P,
    backend: B,
    tuning: Arc<TuningData>,
    auto_open: bool,
    preferred_port: Option<String>,
    channel: ChannelFilter,

    events_tx: Sender<PortEvent>,
    events_rx: Receiver<PortEvent>,

    playing: HashMap<u8, P::Note>,
    held: BTreeMap<usize, BTreeSet<u8>>,
    observed_version: u64,
    observed_mapping: Mapping,

    // Port id handed to the backend and not yet closed.
    requested: Option<String>,
    // Port the user asked for; reopened when it comes back after an unplug.
    wanted: Option<String>,
    auto_open_pending: bool,

    access: Watch<AccessState>,
    inputs: Watch<Vec<InputPort>>,
    active: Watch<Option<ActiveInput>>,
    note_ons: Broadcast<u8>,
    note_offs: Broadcast<u8>,
}

impl<P: NotePlayer, B: MidiBackend> MidiRouter<P, B> {
    /// Creates a router. No access is requested until [`request_access`](Self::request_access).
    pub fn new(player: P, backend: B, tuning: Arc<TuningData>, config: RouterConfig) -> Self {
        let initial = if backend.is_supported() {
            AccessState::Unrequested
        } else {
            AccessState::Unsupported
        };
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let (observed_version, current, _) = tuning.load();
        Self {
            player,
            backend,
            auto_open: config.auto_open,
            preferred_port: config.preferred_port,
            channel: config.channel,
            events_tx,
            events_rx,
            playing: HashMap::new(),
            held: BTreeMap::new(),
            observed_version,
            observed_mapping: current.mapping.clone(),
            tuning,
            requested: None,
            wanted: None,
            auto_open_pending: false,
            access: Watch::new(initial),
            inputs: Watch::new(Vec::new()),
            active: Watch::new(None),
            note_ons: Broadcast::new(),
            note_offs: Broadcast::new(),
        }
    }

    // -- access and ports ---------------------------------------------------

    /// Asks the backend for MIDI access.
    ///
    /// Only valid from [`AccessState::Unrequested`]. On success the port
    /// list is populated and, if configured, an input is opened. A refusal
    /// moves to [`AccessState::Denied`] and is final.
    pub fn request_access(&mut self) -> Result<()> {
        match self.access.get() {
            AccessState::Unrequested => {}
            AccessState::Unsupported => return Err(MidiError::Unsupported),
            AccessState::Granted | AccessState::Denied => return Err(MidiError::AlreadyRequested),
        }

        if let Err(e) = self.backend.request_access() {
            tracing::warn!(error = %e, "MIDI access denied");
            self.access.set(AccessState::Denied);
            return Err(match e {
                MidiError::AccessDenied(_) => e,
                other => MidiError::AccessDenied(other.to_string()),
            });
        }

        tracing::info!("MIDI access granted");
        self.access.set(AccessState::Granted);
        self.backend.watch(self.events_tx.clone());
        self.auto_open_pending = self.auto_open;
        self.refresh_ports()
    }

    /// Re-reads the port list.
    ///
    /// If the active port has vanished the binding transitions to closed.
    /// If the port the user last opened has come back, it is reopened.
    pub fn refresh_ports(&mut self) -> Result<()> {
        if self.access.get() != AccessState::Granted {
            return Err(MidiError::InputsUnavailable);
        }
        let ports = self.backend.ports()?;

        if let Some(id) = self.requested.clone()
            && !ports.iter().any(|p| p.id == id)
        {
            tracing::info!(port = %id, "MIDI input disappeared");
            if let Err(err) = self.backend.close(&id) {
                tracing::debug!(port = %id, error = %err, "closing vanished input failed");
            }
            self.clear_binding();
        }

        if self.inputs.set_if_changed(ports.clone()) {
            tracing::debug!(count = ports.len(), "MIDI inputs changed");
        }

        if self.requested.is_none()
            && let Some(id) = self.reopen_target(&ports)
            && let Err(e) = self.open_input(&id)
        {
            tracing::warn!(port = %id, error = %e, "failed to open MIDI input");
        }
        Ok(())
    }

    fn reopen_target(&self, ports: &[InputPort]) -> Option<String> {
        match &self.wanted {
            Some(id) => ports.iter().any(|p| p.id == *id).then(|| id.clone()),
            None if self.auto_open_pending => {
                let port = match &self.preferred_port {
                    Some(wanted) => ports
                        .iter()
                        .find(|p| p.id == *wanted || p.name.contains(wanted.as_str())),
                    None => ports.first(),
                };
                port.map(|p| p.id.clone())
            }
            None => None,
        }
    }

    /// Binds input `id`, closing the previous binding first.
    ///
    /// Opening the input that is already bound is a no-op.
    pub fn open_input(&mut self, id: &str) -> Result<()> {
        if self.access.get() != AccessState::Granted {
            return Err(MidiError::InputsUnavailable);
        }
        if self.requested.as_deref() == Some(id) {
            return Ok(());
        }

        let ports = self.backend.ports()?;
        self.inputs.set_if_changed(ports.clone());
        if !ports.iter().any(|p| p.id == id) {
            return Err(MidiError::PortNotFound(id.to_string()));
        }

        if let Some(previous) = self.requested.clone() {
            if let Err(e) = self.backend.close(&previous) {
                tracing::debug!(port = %previous, error = %e, "closing previous MIDI input");
            }
            self.clear_binding();
        }

        self.requested = Some(id.to_string());
        self.wanted = Some(id.to_string());
        self.auto_open_pending = false;
        if let Err(e) = self.backend.open(id, self.events_tx.clone()) {
            self.clear_binding();
            return Err(e);
        }
        self.process_pending_events();
        Ok(())
    }

    /// Closes the bound input `id`.
    pub fn close_input(&mut self, id: &str) -> Result<()> {
        if self.requested.as_deref() != Some(id) {
            return Err(MidiError::NotActive(id.to_string()));
        }
        self.wanted = None;
        if let Err(e) = self.backend.close(id) {
            tracing::debug!(port = %id, error = %e, "closing MIDI input");
        }
        self.clear_binding();
        self.process_pending_events();
        Ok(())
    }

    fn clear_binding(&mut self) {
        self.requested = None;
        self.active.set_if_changed(None);
    }

    // -- events ---------------------------------------------------------------

    /// Receiver for backend events, for use in `crossbeam_channel::select!`.
    pub fn events(&self) -> Receiver<PortEvent> {
        self.events_rx.clone()
    }

    /// Handles every queued backend event. Returns how many were handled.
    pub fn process_pending_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Applies one backend event.
    pub fn handle_event(&mut self, event: PortEvent) {
        match event {
            PortEvent::StateChanged { id, state } => self.apply_state(id, state),
            PortEvent::Message { id, bytes } => {
                let routed = self
                    .active
                    .get()
                    .is_some_and(|active| active.id == id && active.is_open());
                if routed {
                    self.handle_midi_message(&bytes);
                } else {
                    tracing::trace!(port = %id, "message from inactive input dropped");
                }
            }
            PortEvent::PortsChanged => {
                if let Err(e) = self.refresh_ports() {
                    tracing::warn!(error = %e, "failed to refresh MIDI inputs");
                }
            }
        }
    }

    fn apply_state(&mut self, id: String, state: ConnectionState) {
        match state {
            ConnectionState::Pending | ConnectionState::Open => {
                if self.requested.as_deref() != Some(id.as_str()) {
                    tracing::trace!(port = %id, ?state, "state change for unrequested input");
                    return;
                }
                let connection = if state == ConnectionState::Open {
                    tracing::info!(port = %id, channel = %self.channel, "MIDI input open");
                    InputConnection::Open
                } else {
                    InputConnection::Pending
                };
                self.active.set_if_changed(Some(ActiveInput {
                    id,
                    connection,
                    channel: self.channel,
                }));
            }
            ConnectionState::Closed | ConnectionState::Disconnected => {
                if self.requested.as_deref() == Some(id.as_str()) {
                    tracing::info!(port = %id, ?state, "MIDI input closed");
                    self.clear_binding();
                }
            }
        }
    }

    // -- notes ----------------------------------------------------------------

    /// Decodes raw bytes and dispatches note-on/off that pass the channel filter.
    ///
    /// Returns true if the message was dispatched.
    pub fn handle_midi_message(&mut self, bytes: &[u8]) -> bool {
        let Some(msg) = message::decode(bytes) else {
            tracing::trace!(?bytes, "ignored MIDI message");
            return false;
        };
        if !self.channel.accepts(msg.channel) {
            tracing::trace!(channel = msg.channel, "message on filtered channel");
            return false;
        }
        self.handle_note(msg.pitch, msg.command, NoteSource::Midi { channel: msg.channel });
        true
    }

    /// Starts a note from the on-screen keyboard.
    pub fn play_note_on(&mut self, pitch: u8) {
        self.handle_note(pitch, NoteCommand::On, NoteSource::Virtual);
    }

    /// Stops a note from the on-screen keyboard.
    pub fn stop_note(&mut self, pitch: u8) {
        self.handle_note(pitch, NoteCommand::Off, NoteSource::Virtual);
    }

    /// Single entry point for note requests from any source.
    ///
    /// Unmapped pitches, including any above 127, are ignored. A note-on
    /// for a pitch that is still sounding stops the old voice first, so
    /// each pitch owns at most one.
    pub fn handle_note(&mut self, pitch: u8, command: NoteCommand, source: NoteSource) {
        let table = self.sync_tuning();

        match command {
            NoteCommand::On => {
                let Some(sound) = table.get(pitch) else {
                    tracing::trace!(pitch, "unmapped pitch ignored");
                    return;
                };
                if let Some(mut previous) = self.playing.remove(&pitch) {
                    self.player.stop_note(&mut previous);
                    self.release_held(pitch);
                }
                let note = self.player.start_note(sound.freq_hz);
                self.playing.insert(pitch, note);
                self.held.entry(sound.degree).or_default().insert(pitch);
                tracing::debug!(pitch, freq_hz = sound.freq_hz, degree = sound.degree, ?source, "note on");
                self.note_ons.publish(pitch);
            }
            NoteCommand::Off => {
                let was_playing = match self.playing.remove(&pitch) {
                    Some(mut note) => {
                        self.player.stop_note(&mut note);
                        true
                    }
                    None => false,
                };
                self.release_held(pitch);
                if was_playing || table.is_mapped(pitch) {
                    tracing::debug!(pitch, ?source, "note off");
                    self.note_offs.publish(pitch);
                }
            }
        }
    }

    /// Stops every sounding note and publishes a note-off for each pitch.
    pub fn all_notes_off(&mut self) {
        let mut pitches: Vec<u8> = self.playing.drain().map(|(pitch, _)| pitch).collect();
        pitches.sort_unstable();
        self.player.all_notes_off();
        self.held.clear();
        for pitch in pitches {
            self.note_offs.publish(pitch);
        }
    }

    fn release_held(&mut self, pitch: u8) {
        self.held.retain(|_, pitches| {
            pitches.remove(&pitch);
            !pitches.is_empty()
        });
    }

    // Picks up a newer table; held degrees are reset if the mapping changed.
    fn sync_tuning(&mut self) -> Arc<tessitura_core::FrequencyTable> {
        let (version, tuning, table) = self.tuning.load();
        if version != self.observed_version {
            self.observed_version = version;
            if tuning.mapping != self.observed_mapping {
                tracing::debug!(version, "mapping changed, held degrees reset");
                self.held.clear();
                self.observed_mapping = tuning.mapping.clone();
            }
        }
        table
    }

    /// Changes the channel filter. Sounding notes keep sounding.
    pub fn set_channel(&mut self, channel: ChannelFilter) {
        if self.channel == channel {
            return;
        }
        self.channel = channel;
        tracing::info!(%channel, "MIDI channel filter changed");
        if let Some(mut active) = self.active.get() {
            active.channel = channel;
            self.active.set(Some(active));
        }
    }

    // -- observers ------------------------------------------------------------

    /// Access state; replays the current value.
    pub fn access_state(&self) -> Subscription<AccessState> {
        self.access.subscribe()
    }

    /// Current access state.
    pub fn current_access_state(&self) -> AccessState {
        self.access.get()
    }

    /// Available inputs; replays the current list.
    ///
    /// Fails until access has been granted.
    pub fn inputs(&self) -> Result<Subscription<Vec<InputPort>>> {
        if self.access.get() == AccessState::Granted {
            Ok(self.inputs.subscribe())
        } else {
            Err(MidiError::InputsUnavailable)
        }
    }

    /// Inputs seen at the last refresh.
    pub fn current_inputs(&self) -> Vec<InputPort> {
        self.inputs.get()
    }

    /// Active binding; replays the current value.
    pub fn active_input(&self) -> Subscription<Option<ActiveInput>> {
        self.active.subscribe()
    }

    /// Current binding.
    pub fn current_active_input(&self) -> Option<ActiveInput> {
        self.active.get()
    }

    /// Pitches started from now on.
    pub fn note_ons(&self) -> Subscription<u8> {
        self.note_ons.subscribe()
    }

    /// Pitches stopped from now on.
    pub fn note_offs(&self) -> Subscription<u8> {
        self.note_offs.subscribe()
    }

    /// Channel filter in effect.
    pub fn channel(&self) -> ChannelFilter {
        self.channel
    }

    /// Sounding pitches, ascending.
    pub fn playing_pitches(&self) -> Vec<u8> {
        let mut pitches: Vec<u8> = self.playing.keys().copied().collect();
        pitches.sort_unstable();
        pitches
    }

    /// Degrees currently held, with the pitches holding each.
    pub fn held_degrees(&mut self) -> &BTreeMap<usize, BTreeSet<u8>> {
        self.sync_tuning();
        &self.held
    }

    /// Tuning service the router reads tables from.
    pub fn tuning(&self) -> &Arc<TuningData> {
        &self.tuning
    }

    /// The note player.
    pub fn player(&self) -> &P {
        &self.player
    }

    /// The note player, mutably (volume and waveform controls).
    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}
