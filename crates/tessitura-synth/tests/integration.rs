//! Integration tests for tessitura-synth.
//!
//! Drives the voice pool through the public API, both against the offline
//! renderer and against a recording graph that captures every command.

use rustfft::{FftPlanner, num_complex::Complex};
use tessitura_synth::{
    AudioGraph, AutomationEvent, ChainId, GraphCommand, RELEASE_TIME_SECS, RenderGraph,
    STOP_TIME_SECS, Synth, SynthConfig, Waveform,
};

const SAMPLE_RATE: f32 = 48000.0;

/// Graph that records commands and lets tests set the clock.
#[derive(Default)]
struct RecordingGraph {
    now: f64,
    chains: u32,
    commands: Vec<GraphCommand>,
}

impl AudioGraph for RecordingGraph {
    fn now(&self) -> f64 {
        self.now
    }

    fn create_chain(&mut self, waveform: Waveform) -> ChainId {
        let chain = ChainId(self.chains);
        self.chains += 1;
        self.commands.push(GraphCommand::CreateChain { chain, waveform });
        chain
    }

    fn submit(&mut self, command: GraphCommand) {
        self.commands.push(command);
    }
}

fn dominant_frequency(buffer: &[f32], sample_rate: f32) -> f32 {
    let fft_size = 8192.min(buffer.len());
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);

    let mut input: Vec<Complex<f32>> = buffer[..fft_size]
        .iter()
        .enumerate()
        .map(|(i, &sample)| {
            let window =
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / fft_size as f32).cos());
            Complex::new(sample * window, 0.0)
        })
        .collect();
    fft.process(&mut input);

    let (bin, _) = input[1..fft_size / 2]
        .iter()
        .enumerate()
        .map(|(i, c)| (i + 1, c.norm_sqr()))
        .fold((0, 0.0_f32), |best, cur| if cur.1 > best.1 { cur } else { best });
    bin as f32 * sample_rate / fft_size as f32
}

#[test]
fn test_rendered_note_has_requested_pitch() {
    let config = SynthConfig {
        waveform: Waveform::Sine,
        ..SynthConfig::default()
    };
    let mut synth = Synth::new(RenderGraph::new(SAMPLE_RATE), config).unwrap();
    let _note = synth.start_note(523.2512);

    let audio = synth.graph_mut().render_seconds(0.5, 1);
    let freq = dominant_frequency(&audio[4800..], SAMPLE_RATE);
    let bin_width = SAMPLE_RATE / 8192.0;
    assert!((freq - 523.2512).abs() <= bin_width, "got {freq} Hz");
}

#[test]
fn test_release_tail_is_silent_after_stop_window() {
    let mut synth = Synth::new(RenderGraph::new(SAMPLE_RATE), SynthConfig::default()).unwrap();
    let mut note = synth.start_note(330.0);
    synth.graph_mut().render_seconds(0.2, 2);
    synth.stop_note(&mut note);

    let tail = synth
        .graph_mut()
        .render_seconds(RELEASE_TIME_SECS + STOP_TIME_SECS + 0.05, 2);
    let last = &tail[tail.len() - 2 * 1200..];
    assert!(last.iter().all(|&s| s == 0.0));
    // No clicks: the release starts from the held level.
    let peak = tail.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
    assert!(peak <= 1.0);
}

#[test]
fn test_sequential_notes_never_exceed_pool_size() {
    let mut synth = Synth::new(RenderGraph::new(SAMPLE_RATE), SynthConfig::default()).unwrap();

    for round in 0..10_u8 {
        let mut notes: Vec<_> = (0..3_u8)
            .map(|i| synth.start_note(220.0 * f64::from(i + 1) + f64::from(round)))
            .collect();
        synth.graph_mut().render_seconds(0.05, 1);
        for note in &mut notes {
            synth.stop_note(note);
        }
        synth
            .graph_mut()
            .render_seconds(RELEASE_TIME_SECS + STOP_TIME_SECS + 0.01, 1);
    }

    assert_eq!(synth.voice_count(), 3);
    assert_eq!(synth.graph().chain_count(), 3);
}

#[test]
fn test_pool_reuses_freed_voice() {
    let mut synth = Synth::new(RenderGraph::new(SAMPLE_RATE), SynthConfig::default()).unwrap();
    for _ in 0..20 {
        let mut note = synth.start_note(440.0);
        synth.graph_mut().render_seconds(0.05, 1);
        synth.stop_note(&mut note);
        synth.graph_mut().render_seconds(0.6, 1);
    }
    assert_eq!(synth.voice_count(), 1);
}

#[test]
fn test_second_stop_schedules_nothing() {
    let mut synth = Synth::new(RecordingGraph::default(), SynthConfig::default()).unwrap();
    let mut note = synth.start_note(440.0);
    synth.graph_mut().now = 1.0;

    synth.stop_note(&mut note);
    let after_first = synth.graph().commands.len();
    synth.graph_mut().now = 1.1;
    synth.stop_note(&mut note);
    assert_eq!(synth.graph().commands.len(), after_first);
}

#[test]
fn test_note_schedules_attack_decay_release() {
    let mut synth = Synth::new(RecordingGraph::default(), SynthConfig::default()).unwrap();
    synth.graph_mut().now = 2.0;
    let _note = synth.start_note(261.6256);

    let gains: Vec<AutomationEvent> = synth
        .graph()
        .commands
        .iter()
        .filter_map(|c| match c {
            GraphCommand::Gain { event, .. } => Some(*event),
            _ => None,
        })
        .collect();
    let comp = Waveform::Square.gain_compensation();
    assert_eq!(
        gains,
        vec![
            AutomationEvent::SetValue { time: 2.0, value: 0.0 },
            AutomationEvent::LinearRamp { time: 2.0 + 0.04, value: comp },
            AutomationEvent::LinearRamp {
                time: 2.0 + 0.04 + 10.0,
                value: 0.2 * comp
            },
            AutomationEvent::LinearRamp {
                time: 2.0 + 0.04 + 10.0 + 0.3,
                value: 0.0
            },
        ]
    );
    assert!(synth.graph().commands.iter().any(|c| matches!(
        c,
        GraphCommand::SetFrequency { freq_hz, .. } if (*freq_hz - 261.6256).abs() < 1e-12
    )));
}

#[test]
fn test_stop_schedules_release_from_current_gain() {
    let mut synth = Synth::new(RecordingGraph::default(), SynthConfig::default()).unwrap();
    let mut note = synth.start_note(440.0);
    synth.graph_mut().now = 0.02;
    let before = synth.graph().commands.len();
    synth.stop_note(&mut note);

    let comp = Waveform::Square.gain_compensation();
    let issued = &synth.graph().commands[before..];
    assert!(matches!(issued[0], GraphCommand::CancelGain { from, .. } if from == 0.02));
    match issued[1] {
        GraphCommand::Gain {
            event: AutomationEvent::SetValue { time, value },
            ..
        } => {
            assert_eq!(time, 0.02);
            assert!((value - comp * 0.5).abs() < 1e-6);
        }
        ref other => panic!("expected held-level set, got {other:?}"),
    }
    assert!(matches!(
        issued.last(),
        Some(GraphCommand::StopOscillator { time, .. }) if (*time - 0.52).abs() < 1e-12
    ));
}
