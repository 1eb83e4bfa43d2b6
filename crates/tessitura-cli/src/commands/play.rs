//! Live playback command: MIDI input through the synth to the sound card.

use std::time::Duration;

use clap::Args;
use crossbeam_channel::{after, bounded, never, select, tick};
use tessitura_io::{AudioBackend, CpalBackend, OutputConfig, start_output};
use tessitura_midi::{AccessState, ChannelFilter, MidiRouter, MidirBackend};
use tessitura_synth::{RELEASE_TIME_SECS, RenderGraph, STOP_TIME_SECS, Synth};

use super::common::{ConfigArg, SynthOverrides, tuning_data};

/// Interval between port rescans.
const PORT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Args)]
pub struct PlayArgs {
    #[command(flatten)]
    config: ConfigArg,

    #[command(flatten)]
    synth: SynthOverrides,

    /// MIDI input to open: exact id or part of the name
    #[arg(short, long)]
    port: Option<String>,

    /// MIDI channel to listen on (1-16 or "omni")
    #[arg(long)]
    channel: Option<ChannelFilter>,

    /// Audio output device (part of the name)
    #[arg(short, long)]
    device: Option<String>,

    /// Audio buffer size in frames
    #[arg(long)]
    buffer_size: Option<u32>,

    /// Stop after this many seconds instead of waiting for Ctrl+C
    #[arg(long)]
    seconds: Option<f64>,
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let mut config = args.config.load()?;
    args.synth.apply(&mut config);
    if let Some(port) = args.port {
        config.midi.preferred_port = Some(port);
        config.midi.auto_open = true;
    }
    if let Some(channel) = args.channel {
        config.midi.channel = channel;
    }
    if let Some(device) = args.device {
        config.audio.device = Some(device);
    }
    if let Some(buffer_size) = args.buffer_size {
        config.audio.buffer_size = buffer_size;
    }
    config.validate()?;

    let tuning = tuning_data(&config)?;

    let backend = CpalBackend::new();
    let output_config = OutputConfig {
        sample_rate: config.audio.sample_rate,
        buffer_size: config.audio.buffer_size,
        channels: 2,
        device_name: config.audio.device.clone(),
    };
    let sample_rate = backend.actual_sample_rate(&output_config);
    let (graph, link) = RenderGraph::linked(sample_rate as f32);
    let _stream = start_output(&backend, &output_config, graph)?;

    let synth = Synth::new(link, config.synth.clone())?;
    let mut router = MidiRouter::new(
        synth,
        MidirBackend::new("tessitura"),
        tuning,
        config.midi.clone(),
    );

    println!("Tessitura Player");
    println!("================");
    println!("Sample rate: {sample_rate} Hz");
    println!("Waveform:    {}", config.synth.waveform);
    println!("Channel:     {}", config.midi.channel);
    println!();

    if let Err(err) = router.request_access() {
        tracing::warn!(error = %err, "MIDI input unavailable, playing nothing");
    }
    if router.current_inputs().is_empty() {
        println!("No MIDI inputs yet; plug one in and it will be opened.");
    }
    println!("Press Ctrl+C to stop.");

    let (stop_tx, stop_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    let deadline = match args.seconds {
        Some(secs) => after(Duration::from_secs_f64(secs.max(0.0))),
        None => never(),
    };
    let events = router.events();
    let note_ons = router.note_ons();
    let note_offs = router.note_offs();
    let active = router.active_input();
    let poll = tick(PORT_POLL_INTERVAL);

    loop {
        select! {
            recv(events) -> event => match event {
                Ok(event) => router.handle_event(event),
                Err(_) => break,
            },
            recv(note_ons.receiver()) -> pitch => {
                if let Ok(pitch) = pitch {
                    let freq = router.tuning().table().frequency(pitch);
                    tracing::debug!(pitch, freq_hz = ?freq, "note on");
                }
            },
            recv(note_offs.receiver()) -> pitch => {
                if let Ok(pitch) = pitch {
                    tracing::debug!(pitch, "note off");
                }
            },
            recv(active.receiver()) -> input => match input {
                Ok(Some(input)) if input.is_open() => {
                    println!("Listening on {} (channel {})", input.id, input.channel);
                }
                Ok(Some(input)) => tracing::info!(port = %input.id, "opening input"),
                Ok(None) => println!("No active MIDI input."),
                Err(_) => break,
            },
            recv(poll) -> _ => {
                if router.current_access_state() == AccessState::Granted
                    && let Err(err) = router.refresh_ports()
                {
                    tracing::warn!(error = %err, "port rescan failed");
                }
            },
            recv(stop_rx) -> _ => break,
            recv(deadline) -> _ => break,
        }
    }

    println!("\nStopping...");
    router.all_notes_off();
    std::thread::sleep(Duration::from_secs_f64(
        RELEASE_TIME_SECS + STOP_TIME_SECS + 0.1,
    ));
    Ok(())
}
