//! Tessitura CLI - play microtonal tunings from a MIDI keyboard.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tessitura")]
#[command(author, version, about = "Microtonal tuning player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the pitch to frequency table of a tuning
    Table(commands::table::TableArgs),

    /// List MIDI input ports
    Ports(commands::ports::PortsArgs),

    /// List audio output devices
    Devices(commands::devices::DevicesArgs),

    /// Play the tuning from a MIDI input until Ctrl+C
    Play(commands::play::PlayArgs),

    /// Render notes offline into a WAV file
    Render(commands::render::RenderArgs),

    /// Show or initialize the configuration file
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Table(args) => commands::table::run(args),
        Commands::Ports(args) => commands::ports::run(args),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Play(args) => commands::play::run(args),
        Commands::Render(args) => commands::render::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
