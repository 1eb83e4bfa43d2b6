//! Router behaviour against the virtual backend.

use std::sync::Arc;

use tessitura_core::{Mapping, Tuning, TuningData};
use tessitura_midi::message::{note_off, note_on};
use tessitura_midi::{
    AccessState, ActiveInput, ChannelFilter, InputConnection, MidiError, MidiRouter,
    RouterConfig, VirtualMidiBackend,
};
use tessitura_synth::{
    NotePlayer, RELEASE_TIME_SECS, RenderGraph, STOP_TIME_SECS, Synth, SynthConfig,
};

/// Records every start/stop with the frequency involved.
#[derive(Default)]
struct Log {
    started: Vec<f64>,
    stopped: Vec<f64>,
    panics: usize,
}

impl NotePlayer for Log {
    type Note = f64;

    fn start_note(&mut self, freq_hz: f64) -> f64 {
        self.started.push(freq_hz);
        freq_hz
    }

    fn stop_note(&mut self, note: &mut f64) {
        self.stopped.push(*note);
    }

    fn all_notes_off(&mut self) {
        self.panics += 1;
    }
}

fn granted_router(
    config: RouterConfig,
) -> (MidiRouter<Log, VirtualMidiBackend>, VirtualMidiBackend) {
    let backend = VirtualMidiBackend::new();
    backend.plug("a", "Keys A");
    backend.plug("b", "Pads B");
    let mut router = MidiRouter::new(
        Log::default(),
        backend.clone(),
        Arc::new(TuningData::default()),
        config,
    );
    router.request_access().unwrap();
    (router, backend)
}

fn active(id: &str, connection: InputConnection) -> Option<ActiveInput> {
    Some(ActiveInput {
        id: id.to_string(),
        connection,
        channel: ChannelFilter::Omni,
    })
}

#[test]
fn test_access_grant_auto_opens_first_input() {
    let (router, backend) = granted_router(RouterConfig::default());
    assert_eq!(router.current_access_state(), AccessState::Granted);
    assert_eq!(router.current_inputs().len(), 2);
    assert_eq!(router.current_active_input(), active("a", InputConnection::Open));
    assert!(backend.is_open("a"));
}

#[test]
fn test_auto_open_prefers_named_port() {
    let config = RouterConfig {
        preferred_port: Some("Pads".into()),
        ..RouterConfig::default()
    };
    let (router, _) = granted_router(config);
    assert_eq!(router.current_active_input(), active("b", InputConnection::Open));
}

#[test]
fn test_auto_open_disabled() {
    let config = RouterConfig {
        auto_open: false,
        ..RouterConfig::default()
    };
    let (router, _) = granted_router(config);
    assert_eq!(router.current_active_input(), None);
}

#[test]
fn test_channel_filter_drops_other_channels() {
    let config = RouterConfig {
        channel: ChannelFilter::displayed(4).unwrap(),
        ..RouterConfig::default()
    };
    let (mut router, backend) = granted_router(config);

    backend.send("a", &note_on(5, 60, 100));
    router.process_pending_events();
    assert!(router.player().started.is_empty());

    backend.send("a", &note_on(3, 60, 100));
    router.process_pending_events();
    assert_eq!(router.player().started.len(), 1);
}

#[test]
fn test_zero_velocity_note_on_stops_note() {
    let (mut router, backend) = granted_router(RouterConfig::default());
    let offs = router.note_offs();

    backend.send("a", &[0x91, 60, 100]);
    backend.send("a", &[0x91, 60, 0]);
    router.process_pending_events();

    assert_eq!(router.player().stopped.len(), 1);
    assert_eq!(offs.try_recv(), Some(60));
    assert!(router.playing_pitches().is_empty());
}

#[test]
fn test_unmapped_pitch_never_starts() {
    let mut tuning = Tuning::twelve_tet();
    tuning.mapping.keys[1] = None;
    let data = Arc::new(TuningData::new(tuning).unwrap());
    let mut router = MidiRouter::new(
        Log::default(),
        VirtualMidiBackend::new(),
        data,
        RouterConfig::default(),
    );
    let ons = router.note_ons();
    let offs = router.note_offs();

    router.play_note_on(61);
    router.stop_note(61);
    router.play_note_on(73);

    assert!(router.player().started.is_empty());
    assert_eq!(ons.try_recv(), None);
    assert_eq!(offs.try_recv(), None);
}

#[test]
fn test_note_frequencies_follow_table() {
    let (mut router, backend) = granted_router(RouterConfig::default());
    backend.send("a", &note_on(0, 69, 100));
    router.process_pending_events();
    let started = &router.player().started;
    assert_eq!(started.len(), 1);
    assert!((started[0] - 440.0).abs() < 0.01, "got {}", started[0]);
}

#[test]
fn test_switching_inputs_closes_previous_first() {
    let (mut router, backend) = granted_router(RouterConfig::default());
    let states = router.active_input();
    router.open_input("b").unwrap();

    let seen: Vec<_> = states.try_iter().collect();
    assert_eq!(
        seen,
        vec![
            active("a", InputConnection::Open),
            None,
            active("b", InputConnection::Pending),
            active("b", InputConnection::Open),
        ]
    );
    assert!(!backend.is_open("a"));

    // Old port is no longer routed.
    backend.send("a", &note_on(0, 60, 100));
    router.process_pending_events();
    assert!(router.player().started.is_empty());
}

#[test]
fn test_open_same_input_is_noop() {
    let (mut router, _) = granted_router(RouterConfig::default());
    let states = router.active_input();
    let _ = states.try_iter().count();
    router.open_input("a").unwrap();
    assert_eq!(states.try_recv(), None);
}

#[test]
fn test_open_unknown_input() {
    let (mut router, _) = granted_router(RouterConfig::default());
    assert_eq!(
        router.open_input("nope"),
        Err(MidiError::PortNotFound("nope".into()))
    );
    assert_eq!(router.current_active_input(), active("a", InputConnection::Open));
}

#[test]
fn test_close_input() {
    let (mut router, backend) = granted_router(RouterConfig::default());
    assert_eq!(
        router.close_input("b"),
        Err(MidiError::NotActive("b".into()))
    );
    router.close_input("a").unwrap();
    assert_eq!(router.current_active_input(), None);
    assert!(!backend.is_open("a"));
}

#[test]
fn test_set_channel_republishes_binding() {
    let (mut router, _) = granted_router(RouterConfig::default());
    let states = router.active_input();
    let _ = states.try_iter().count();

    router.set_channel(ChannelFilter::Channel(9));
    let binding = states.try_recv().flatten().unwrap();
    assert_eq!(binding.channel, ChannelFilter::Channel(9));

    router.set_channel(ChannelFilter::Channel(9));
    assert_eq!(states.try_recv(), None);
}

#[test]
fn test_denied_access() {
    let mut router = MidiRouter::new(
        Log::default(),
        VirtualMidiBackend::denying("user said no"),
        Arc::new(TuningData::default()),
        RouterConfig::default(),
    );
    assert_eq!(router.current_access_state(), AccessState::Unrequested);
    assert_eq!(
        router.request_access(),
        Err(MidiError::AccessDenied("user said no".into()))
    );
    assert_eq!(router.current_access_state(), AccessState::Denied);
    assert_eq!(router.request_access(), Err(MidiError::AlreadyRequested));
    assert!(router.inputs().is_err());
}

#[test]
fn test_unsupported_platform() {
    let mut router = MidiRouter::new(
        Log::default(),
        VirtualMidiBackend::unsupported(),
        Arc::new(TuningData::default()),
        RouterConfig::default(),
    );
    assert_eq!(router.current_access_state(), AccessState::Unsupported);
    assert_eq!(router.request_access(), Err(MidiError::Unsupported));
    assert_eq!(router.open_input("a"), Err(MidiError::InputsUnavailable));
}

#[test]
fn test_second_request_rejected() {
    let (mut router, _) = granted_router(RouterConfig::default());
    assert_eq!(router.request_access(), Err(MidiError::AlreadyRequested));
}

#[test]
fn test_hot_unplug_and_replug() {
    let (mut router, backend) = granted_router(RouterConfig::default());
    let inputs = router.inputs().unwrap();
    let _ = inputs.try_iter().count();

    backend.unplug("a");
    router.process_pending_events();
    assert_eq!(router.current_active_input(), None);
    let listed = inputs.latest().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "b");

    backend.plug("a", "Keys A");
    router.process_pending_events();
    assert_eq!(router.current_active_input(), active("a", InputConnection::Open));
}

#[test]
fn test_rescan_drops_vanished_input_before_its_events() {
    let (mut router, backend) = granted_router(RouterConfig::default());
    backend.unplug("a");

    // The backend already forgot the port, so closing it fails quietly.
    router.refresh_ports().unwrap();
    assert_eq!(router.current_active_input(), None);
    assert_eq!(router.current_inputs().len(), 1);

    router.process_pending_events();
    assert_eq!(router.current_active_input(), None);
}

#[test]
fn test_explicit_close_is_not_reopened() {
    let (mut router, backend) = granted_router(RouterConfig::default());
    router.close_input("a").unwrap();
    backend.plug("c", "Another");
    router.process_pending_events();
    assert_eq!(router.current_active_input(), None);
}

#[test]
fn test_held_degrees_reset_on_mapping_change() {
    let (mut router, backend) = granted_router(RouterConfig::default());
    backend.send("a", &note_on(0, 60, 100));
    backend.send("a", &note_on(0, 72, 100));
    router.process_pending_events();
    assert_eq!(router.held_degrees().len(), 1);

    let mut tuning = Tuning::twelve_tet();
    tuning.mapping = Mapping::identity(62, 12);
    router.tuning().update(tuning).unwrap();
    assert!(router.held_degrees().is_empty());

    // Notes started before the remap still stop.
    backend.send("a", &note_off(0, 60));
    router.process_pending_events();
    assert_eq!(router.player().stopped.len(), 1);
}

#[test]
fn test_routes_into_synth() {
    let backend = VirtualMidiBackend::new();
    backend.plug("kbd", "Keyboard");
    let synth = Synth::new(RenderGraph::new(48000.0), SynthConfig::default()).unwrap();
    let mut router = MidiRouter::new(
        synth,
        backend.clone(),
        Arc::new(TuningData::default()),
        RouterConfig::default(),
    );
    router.request_access().unwrap();

    for pitch in [60, 64, 67] {
        backend.send("kbd", &note_on(0, pitch, 100));
    }
    router.process_pending_events();
    assert_eq!(router.player().busy_voices(), 3);

    let audio = router.player_mut().graph_mut().render_seconds(0.1, 2);
    assert!(audio.iter().any(|s| s.abs() > 0.01));

    // Panic reaches the voice pool.
    router.all_notes_off();
    router
        .player_mut()
        .graph_mut()
        .render_seconds(RELEASE_TIME_SECS + STOP_TIME_SECS + 0.01, 2);
    assert_eq!(router.player().busy_voices(), 0);
    assert_eq!(router.player().voice_count(), 3);
}
