//! Offline render command: plays pitches through the synth into a WAV file.

use std::path::PathBuf;

use clap::Args;
use tessitura_io::{WavSpec, write_wav};
use tessitura_midi::{MidiRouter, VirtualMidiBackend};
use tessitura_synth::{RELEASE_TIME_SECS, RenderGraph, STOP_TIME_SECS, Synth};

use super::common::{ConfigArg, SynthOverrides, tuning_data};

const CHANNELS: usize = 2;

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    config: ConfigArg,

    #[command(flatten)]
    synth: SynthOverrides,

    /// MIDI pitches to play, comma-separated
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "60,64,67",
        value_parser = clap::value_parser!(u8).range(..=127)
    )]
    pitches: Vec<u8>,

    /// Seconds each note is held
    #[arg(long, default_value = "0.5")]
    note_secs: f64,

    /// Play all pitches at once instead of one after another
    #[arg(long)]
    chord: bool,

    /// Sample rate (defaults to the configured audio sample rate)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Bit depth (16, 24 or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,

    /// Output WAV file
    #[arg(short, long, default_value = "tessitura.wav")]
    output: PathBuf,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let mut config = args.config.load()?;
    args.synth.apply(&mut config);
    if let Some(sample_rate) = args.sample_rate {
        config.audio.sample_rate = sample_rate;
    }
    config.validate()?;
    if ![16, 24, 32].contains(&args.bit_depth) {
        anyhow::bail!("unsupported bit depth {} (expected 16, 24 or 32)", args.bit_depth);
    }
    if !args.note_secs.is_finite() || args.note_secs <= 0.0 {
        anyhow::bail!("--note-secs must be positive");
    }

    let tuning = tuning_data(&config)?;
    let table = tuning.table();
    for &pitch in &args.pitches {
        if !table.is_mapped(pitch) {
            tracing::warn!(pitch, "pitch is unmapped and will be silent");
        }
    }

    let sample_rate = config.audio.sample_rate;
    let synth = Synth::new(RenderGraph::new(sample_rate as f32), config.synth.clone())?;
    let mut router = MidiRouter::new(
        synth,
        VirtualMidiBackend::new(),
        tuning,
        config.midi.clone(),
    );

    let mut samples = Vec::new();
    let mut render = |router: &mut MidiRouter<Synth<RenderGraph>, VirtualMidiBackend>, secs: f64| {
        samples.extend(router.player_mut().graph_mut().render_seconds(secs, CHANNELS));
    };

    if args.chord {
        for &pitch in &args.pitches {
            router.play_note_on(pitch);
        }
        render(&mut router, args.note_secs);
        for &pitch in &args.pitches {
            router.stop_note(pitch);
        }
    } else {
        for &pitch in &args.pitches {
            router.play_note_on(pitch);
            render(&mut router, args.note_secs);
            router.stop_note(pitch);
        }
    }
    render(&mut router, RELEASE_TIME_SECS + STOP_TIME_SECS);

    let spec = WavSpec {
        channels: CHANNELS as u16,
        sample_rate,
        bits_per_sample: args.bit_depth,
    };
    write_wav(&args.output, &samples, spec)?;

    let frames = samples.len() / CHANNELS;
    println!(
        "Wrote {} ({} frames, {:.2} s, {} notes)",
        args.output.display(),
        frames,
        frames as f64 / f64::from(sample_rate),
        args.pitches.len()
    );
    Ok(())
}
