//! MIDI input listing command.

use clap::Args;
use tessitura_midi::{MidiBackend, MidirBackend};

#[derive(Args)]
pub struct PortsArgs {
    /// Print JSON instead of a list
    #[arg(long)]
    json: bool,
}

pub fn run(args: PortsArgs) -> anyhow::Result<()> {
    let mut backend = MidirBackend::new("tessitura");
    backend.request_access()?;
    let ports = backend.ports()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
        return Ok(());
    }

    if ports.is_empty() {
        println!("No MIDI input ports found.");
        return Ok(());
    }

    println!("MIDI Input Ports");
    println!("================\n");
    for (idx, port) in ports.iter().enumerate() {
        println!("  [{}] {}", idx, port.id);
    }
    println!();
    println!("Tip: pick one with --port (exact id or part of the name):");
    println!("  tessitura play --port \"{}\"", ports[0].id);
    Ok(())
}
