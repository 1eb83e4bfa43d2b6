//! Pluggable audio output backend.
//!
//! [`AudioBackend`] decouples the player from any particular platform audio
//! API. [`CpalBackend`](crate::CpalBackend) is the desktop implementation;
//! tests substitute a backend that drives the callback by hand.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │   tessitura play (control)   │
//! └──────────────┬───────────────┘
//!                │ start_output(backend, config, RenderGraph)
//!                ▼
//! ┌──────────────────────────────┐
//! │      AudioBackend trait      │
//! │ list_devices / build_output  │
//! └──────────────┬───────────────┘
//!                ▼
//!          CpalBackend (ALSA, CoreAudio, WASAPI)
//! ```
//!
//! Callbacks are boxed closures so the trait stays object-safe, and streams
//! come back as a type-erased [`StreamHandle`] that stops playback on drop.

use crate::{AudioDevice, Result};

/// Output stream parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Device name filter (case-insensitive substring). System default if `None`.
    pub device_name: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 512,
            channels: 2,
            device_name: None,
        }
    }
}

/// Type-erased stream handle. The stream runs while this handle exists.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Wraps a backend-specific stream object, keeping it alive until drop.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Output callback: fill the interleaved buffer `[L0, R0, L1, R1, ...]`.
///
/// Runs on the real-time audio thread. Must not allocate, lock or block.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Called with a message when the backend reports a stream error.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Platform audio output.
pub trait AudioBackend: Send {
    /// Backend name, e.g. `"cpal"`.
    fn name(&self) -> &str;

    /// Output devices available on the system.
    fn list_devices(&self) -> Result<Vec<AudioDevice>>;

    /// The system default output device, if any.
    fn default_output_device(&self) -> Result<Option<AudioDevice>>;

    /// Builds and starts an output stream.
    fn build_output_stream(
        &self,
        config: &OutputConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// Sample rate the stream will actually run at for `config`.
    ///
    /// The renderer must be built at this rate. Defaults to the requested rate.
    fn actual_sample_rate(&self, config: &OutputConfig) -> u32 {
        config.sample_rate
    }
}
