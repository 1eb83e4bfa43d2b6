//! Configuration file command.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use tessitura_config::{PlayerConfig, default_config_path};

use super::common::ConfigArg;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print where the configuration file is looked up
    Path,

    /// Print the effective configuration as TOML
    Show {
        #[command(flatten)]
        config: ConfigArg,
    },

    /// Write a configuration file with default settings
    Init {
        /// Destination (defaults to the user configuration file)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Path => {
            let path = default_config_path();
            let status = if path.exists() { "exists" } else { "not created yet" };
            println!("{} ({status})", path.display());
            Ok(())
        }
        ConfigCommand::Show { config } => {
            print!("{}", config.load()?.to_toml()?);
            Ok(())
        }
        ConfigCommand::Init { path, force } => {
            let path = path.unwrap_or_else(default_config_path);
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            PlayerConfig::default().save(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}
