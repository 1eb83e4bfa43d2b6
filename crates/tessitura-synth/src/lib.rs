//! Tessitura Synth - voice pool and audio graph
//!
//! Polyphonic playback for the microtonal keyboard: the voice pool schedules
//! click-free amplitude envelopes as timestamped automation, and a small
//! audio graph renders them.
//!
//! # Components
//!
//! - [`Synth`] - Voice pool: note start/stop, master volume, waveform
//! - [`NotePlayer`] - The seam the MIDI router plays notes through
//! - [`AudioGraph`] - Control-side interface to the graph
//! - [`RenderGraph`] - Sample renderer (chains → master gain → [`Limiter`])
//! - [`GraphLink`] - Channel-backed [`AudioGraph`] for a renderer running in
//!   an audio callback
//! - [`AutomationTimeline`] - Web Audio style parameter automation
//! - [`Oscillator`] - PolyBLEP oscillator for each [`Waveform`]
//!
//! # Example
//!
//! ```rust
//! use tessitura_synth::{RenderGraph, Synth, SynthConfig, Waveform};
//!
//! let (mut renderer, link) = RenderGraph::linked(48000.0);
//! let mut synth = Synth::new(link, SynthConfig::default()).unwrap();
//! synth.set_waveform(Waveform::Sawtooth);
//!
//! let mut note = synth.start_note(440.0);
//!
//! // Audio thread side:
//! let mut buffer = vec![0.0_f32; 1024];
//! renderer.render(&mut buffer, 2);
//!
//! synth.stop_note(&mut note);
//! ```

pub mod automation;
pub mod graph;
pub mod limiter;
pub mod oscillator;
pub mod render;
pub mod synth;

pub use automation::{AutomationEvent, AutomationTimeline};
pub use graph::{AudioClock, AudioGraph, ChainId, GraphCommand, GraphLink};
pub use limiter::Limiter;
pub use oscillator::{Oscillator, ParseWaveformError, Waveform};
pub use render::RenderGraph;
pub use synth::{
    ATTACK_TIME_SECS, DECAY_TIME_SECS, NEAR_SILENCE, NotePlayer, NoteHandle, RELEASE_TIME_SECS,
    STOP_TIME_SECS, SUSTAIN_LEVEL, Synth, SynthConfig, SynthError, scaled_volume,
};
