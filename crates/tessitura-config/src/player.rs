//! The player configuration file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tessitura_core::Tuning;
use tessitura_midi::RouterConfig;
use tessitura_synth::SynthConfig;

use crate::error::ConfigError;
use crate::paths;
use crate::validation::{
    BUFFER_SIZE_RANGE, SAMPLE_RATE_RANGE, ValidationError, check_range,
};

/// `[audio]` table: output stream settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Output device name filter. System default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 512,
            device: None,
        }
    }
}

/// Everything `tessitura play` needs.
///
/// Every table is optional in the file; missing tables and keys take their
/// defaults, and a missing `[tuning]` means 12-TET on middle C.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Voice pool settings.
    pub synth: SynthConfig,
    /// MIDI input settings.
    pub midi: RouterConfig,
    /// Audio output settings.
    pub audio: AudioConfig,
    /// Tuning to play. 12-TET when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuning: Option<Tuning>,
}

impl PlayerConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded player config");
        Ok(config)
    }

    /// Parses and validates a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `explicit`, or the default file if it exists, or defaults.
    ///
    /// Returns the path that was read, if any.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match paths::resolve_config_path(explicit) {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => {
                tracing::debug!("no config file, using defaults");
                Ok((Self::default(), None))
            }
        }
    }

    /// Saves the configuration, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        tracing::info!(path = %path.display(), "saved player config");
        Ok(())
    }

    /// Serializes to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks every setting, reporting all problems at once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        check_range(&mut errors, "synth.volume", f64::from(self.synth.volume), 0.0, 1.0);
        check_range(
            &mut errors,
            "audio.sample_rate",
            f64::from(self.audio.sample_rate),
            f64::from(SAMPLE_RATE_RANGE.0),
            f64::from(SAMPLE_RATE_RANGE.1),
        );
        check_range(
            &mut errors,
            "audio.buffer_size",
            f64::from(self.audio.buffer_size),
            f64::from(BUFFER_SIZE_RANGE.0),
            f64::from(BUFFER_SIZE_RANGE.1),
        );
        if let Some(tuning) = &self.tuning
            && let Err(e) = tuning.validate()
        {
            errors.push(ValidationError::Tuning(e));
        }
        ValidationError::from_list(errors).map_or(Ok(()), Err)
    }

    /// The configured tuning, or 12-TET.
    pub fn tuning_or_default(&self) -> Tuning {
        self.tuning.clone().unwrap_or_default()
    }
}
