//! Pitch table command.

use clap::Args;
use serde::Serialize;
use tessitura_core::compute_lookup_table;

use super::common::ConfigArg;

#[derive(Args)]
pub struct TableArgs {
    #[command(flatten)]
    config: ConfigArg,

    /// Include unmapped pitches
    #[arg(long)]
    all: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Row {
    pitch: u8,
    freq_hz: Option<f64>,
    degree: Option<usize>,
}

pub fn run(args: TableArgs) -> anyhow::Result<()> {
    let config = args.config.load()?;
    let tuning = config.tuning_or_default();
    tuning.validate()?;
    let table = compute_lookup_table(&tuning);

    let rows: Vec<Row> = table
        .iter()
        .filter(|(_, sound)| args.all || sound.is_some())
        .map(|(pitch, sound)| Row {
            pitch,
            freq_hz: sound.map(|s| s.freq_hz),
            degree: sound.map(|s| s.degree),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Pitch  Frequency (Hz)  Degree");
    println!("-----  --------------  ------");
    for row in &rows {
        match (row.freq_hz, row.degree) {
            (Some(freq), Some(degree)) => {
                println!("{:>5}  {:>14.4}  {:>6}", row.pitch, freq, degree);
            }
            _ => println!("{:>5}  {:>14}  {:>6}", row.pitch, "-", "-"),
        }
    }
    println!();
    println!(
        "{} of 128 pitches mapped ({} degrees, {} keys per span)",
        table.mapped_count(),
        tuning.degrees.len(),
        tuning.mapping.key_span
    );
    Ok(())
}
