//! Player configuration for tessitura.
//!
//! A single TOML file holds the voice pool settings, the MIDI input
//! settings, the audio output settings and, optionally, the tuning to play.
//!
//! ```toml
//! [synth]
//! volume = 0.8
//! waveform = "square"
//!
//! [midi]
//! channel = "omni"
//! auto_open = true
//! port = "Keystation"
//!
//! [audio]
//! sample_rate = 48000
//! buffer_size = 512
//!
//! [tuning]
//! root_freq_hz = 261.6256
//! octaves_spanned = 1
//! degrees = [{ ratio = [1, 1] }, { ratio = [9, 8] }, { ratio = [5, 4] }]
//!
//! [tuning.mapping]
//! root_key = 60
//! key_span = 3
//! keys = [0, 1, 2]
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use tessitura_config::{PlayerConfig, default_config_path};
//!
//! let (mut config, _) = PlayerConfig::load_or_default(None).unwrap();
//! config.synth.volume = 0.6;
//! config.save(default_config_path()).unwrap();
//! ```

mod error;
mod player;

/// Platform-specific configuration paths.
pub mod paths;

/// Setting range checks.
pub mod validation;

pub use error::ConfigError;
pub use paths::{default_config_path, user_config_dir};
pub use player::{AudioConfig, PlayerConfig};
pub use validation::ValidationError;
