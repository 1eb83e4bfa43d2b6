//! Tessitura MIDI - input routing
//!
//! Turns raw MIDI bytes and on-screen key presses into notes on a
//! [`NotePlayer`](tessitura_synth::NotePlayer), using the current
//! [`FrequencyTable`](tessitura_core::FrequencyTable) to pick frequencies.
//!
//! # Components
//!
//! - [`MidiRouter`] - Access/port lifecycle, channel filter, note dispatch
//! - [`message`] - Note-on/note-off decoding
//! - [`ChannelFilter`] - Omni or a single channel
//! - [`MidiBackend`] - Platform seam; [`MidirBackend`] for real devices,
//!   [`VirtualMidiBackend`] for in-process ports
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tessitura_core::TuningData;
//! use tessitura_midi::{MidiRouter, RouterConfig, VirtualMidiBackend, message};
//! use tessitura_synth::{RenderGraph, Synth, SynthConfig};
//!
//! let backend = VirtualMidiBackend::new();
//! backend.plug("kbd", "Keyboard");
//!
//! let synth = Synth::new(RenderGraph::new(48000.0), SynthConfig::default()).unwrap();
//! let tuning = Arc::new(TuningData::default());
//! let mut router = MidiRouter::new(synth, backend.clone(), tuning, RouterConfig::default());
//!
//! router.request_access().unwrap();
//! assert!(router.current_active_input().is_some_and(|a| a.is_open()));
//!
//! backend.send("kbd", &message::note_on(0, 60, 100));
//! router.process_pending_events();
//! assert_eq!(router.playing_pitches(), vec![60]);
//! ```

pub mod backend;
pub mod channel;
pub mod error;
pub mod message;
pub mod midir_backend;
pub mod port;
pub mod router;
pub mod virtual_backend;

pub use backend::{MidiBackend, PortEvent};
pub use channel::{ChannelFilter, ParseChannelError};
pub use error::{MidiError, Result};
pub use message::{NoteCommand, NoteMessage};
pub use midir_backend::MidirBackend;
pub use port::{AccessState, ActiveInput, ConnectionState, InputConnection, InputPort};
pub use router::{MidiRouter, NoteSource, RouterConfig};
pub use virtual_backend::VirtualMidiBackend;
