//! Shared argument groups and helpers.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tessitura_config::PlayerConfig;
use tessitura_core::TuningData;
use tessitura_synth::Waveform;

/// `--config` for commands that read the player configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArg {
    /// Configuration file (defaults to the user configuration file, if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl ConfigArg {
    /// Loads the configuration, falling back to defaults when there is no file.
    pub fn load(&self) -> anyhow::Result<PlayerConfig> {
        let (config, path) = PlayerConfig::load_or_default(self.config.as_deref())?;
        match path {
            Some(path) => tracing::info!(path = %path.display(), "using config file"),
            None => tracing::info!("no config file, using defaults"),
        }
        Ok(config)
    }
}

/// Synth settings that can be overridden on the command line.
#[derive(Args, Debug, Clone, Default)]
pub struct SynthOverrides {
    /// Oscillator waveform: sine, triangle, square or sawtooth
    #[arg(long)]
    pub waveform: Option<Waveform>,

    /// Master volume, 0.0 to 1.0
    #[arg(long)]
    pub volume: Option<f32>,
}

impl SynthOverrides {
    /// Writes the overrides into `config`.
    pub fn apply(&self, config: &mut PlayerConfig) {
        if let Some(waveform) = self.waveform {
            config.synth.waveform = waveform;
        }
        if let Some(volume) = self.volume {
            config.synth.volume = volume;
        }
    }
}

/// Tuning service for the configured tuning.
pub fn tuning_data(config: &PlayerConfig) -> anyhow::Result<Arc<TuningData>> {
    Ok(Arc::new(TuningData::new(config.tuning_or_default())?))
}
