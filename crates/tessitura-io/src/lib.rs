//! Audio I/O for tessitura.
//!
//! This crate provides:
//!
//! - **Device enumeration**: [`list_output_devices`] and [`default_output_device`]
//! - **Real-time output**: [`start_output`] hosts a [`RenderGraph`](tessitura_synth::RenderGraph)
//!   inside an [`AudioBackend`] output callback
//! - **Offline rendering**: [`write_wav`] / [`read_wav`] for rendered takes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tessitura_io::{CpalBackend, AudioBackend, OutputConfig, start_output};
//! use tessitura_synth::{RenderGraph, Synth, SynthConfig};
//!
//! let backend = CpalBackend::new();
//! let config = OutputConfig::default();
//! let (renderer, link) = RenderGraph::linked(backend.actual_sample_rate(&config) as f32);
//! let _stream = start_output(&backend, &config, renderer)?;
//!
//! let mut synth = Synth::new(link, SynthConfig::default())?;
//! let note = synth.start_note(440.0);
//! ```

pub mod backend;
pub mod cpal_backend;
mod device;
mod output;
mod wav;

pub use backend::{AudioBackend, ErrorCallback, OutputCallback, OutputConfig, StreamHandle};
pub use cpal_backend::CpalBackend;
pub use device::{AudioDevice, default_output_device, list_output_devices};
pub use output::start_output;
pub use wav::{WavInfo, WavSpec, read_wav, read_wav_info, write_wav};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio output device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Stream parameters the backend cannot honour.
    #[error("Invalid stream configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
