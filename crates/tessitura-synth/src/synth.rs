//! Polyphonic voice pool.
//!
//! Each voice is one oscillator → gain chain in the audio graph. Starting a
//! note schedules its whole envelope up front:
//!
//! ```text
//! gain
//!  comp ┤   /‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾───────__
//!       │  /                              ‾‾‾──__ 0.2·comp
//!       │ /                                       ╲
//!     0 ┼/─────────────────────────────────────────╲──► t
//!       now  +0.04 (attack)        +10 s (decay)   +0.3 s (auto release)
//! ```
//!
//! Stopping a note replaces whatever remains with a release from the
//! instantaneous gain: exponential to near silence over 0.3 s, then linear
//! to zero over 0.2 s, after which the oscillator stops and the voice is
//! free again. A voice is reused only once the audio clock has passed its
//! busy window; when none is free the pool grows by one chain. Voices are
//! never dropped.

use serde::{Deserialize, Serialize};
use tessitura_core::{Subscription, Watch, db_to_linear};
use thiserror::Error;

use crate::automation::{AutomationEvent, AutomationTimeline};
use crate::graph::{AudioGraph, ChainId, GraphCommand};
use crate::oscillator::Waveform;

/// Attack ramp to peak gain.
pub const ATTACK_TIME_SECS: f64 = 0.04;
/// Decay from peak to the sustain level while a note is held.
pub const DECAY_TIME_SECS: f64 = 10.0;
/// Release ramp after a note stops.
pub const RELEASE_TIME_SECS: f64 = 0.3;
/// Tail after the release before the oscillator stops.
pub const STOP_TIME_SECS: f64 = 0.2;
/// Gain reached at the end of the decay, relative to the peak.
pub const SUSTAIN_LEVEL: f32 = 0.2;
/// Target of the exponential release ramp.
pub const NEAR_SILENCE: f32 = 0.0001;
/// Initial normalized master volume (about -9.6 dB).
pub const DEFAULT_VOLUME: f32 = 0.8;

/// Maps a normalized volume in `[0, 1]` to a linear master gain.
///
/// Below 0.1 is silence; otherwise the volume is spread linearly over
/// -36 dB to -3 dB.
///
/// ```rust
/// use tessitura_synth::scaled_volume;
///
/// assert_eq!(scaled_volume(0.05), 0.0);
/// assert!((scaled_volume(1.0) - 0.7079).abs() < 1e-3);
/// ```
pub fn scaled_volume(normalized: f32) -> f32 {
    if normalized < 0.1 {
        return 0.0;
    }
    db_to_linear(-36.0 + 33.0 * normalized)
}

/// Errors from the voice pool.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthError {
    /// Volume outside `[0, 1]`.
    #[error("volume must be in [0.0, 1.0], got {0}")]
    VolumeOutOfRange(f32),
}

/// Voice pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Normalized master volume in `[0, 1]`.
    pub volume: f32,
    /// Oscillator waveform for all voices.
    pub waveform: Waveform,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            waveform: Waveform::default(),
        }
    }
}

#[derive(Debug, Clone)]
struct Voice {
    chain: ChainId,
    /// Control-side copy of the chain's gain timeline.
    envelope: AutomationTimeline,
    busy_until: f64,
    generation: u64,
    released: bool,
}

/// Handle to a started note, needed to stop it.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteHandle {
    voice: usize,
    generation: u64,
    freq_hz: f64,
    stopped: bool,
}

impl NoteHandle {
    /// Frequency the note was started at.
    pub fn freq_hz(&self) -> f64 {
        self.freq_hz
    }

    /// True once the note has been stopped through this handle.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Index of the voice in the pool.
    pub fn voice(&self) -> usize {
        self.voice
    }
}

/// Something that can start and stop notes by frequency.
pub trait NotePlayer {
    /// Token returned by `start_note` and consumed by `stop_note`.
    type Note;

    /// Starts a note.
    fn start_note(&mut self, freq_hz: f64) -> Self::Note;

    /// Releases a note. Must be safe to call more than once.
    fn stop_note(&mut self, note: &mut Self::Note);

    /// Releases everything still sounding. Outstanding notes become stale.
    fn all_notes_off(&mut self);
}

/// Polyphonic synthesizer scheduling envelopes on an [`AudioGraph`].
#[derive(Debug)]
pub struct Synth<G: AudioGraph> {
    graph: G,
    voices: Vec<Voice>,
    master: AutomationTimeline,
    volume: Watch<f32>,
    waveform: Watch<Waveform>,
}

impl<G: AudioGraph> Synth<G> {
    /// Creates the pool and sets the master gain from `config.volume`.
    pub fn new(mut graph: G, config: SynthConfig) -> Result<Self, SynthError> {
        if !(0.0..=1.0).contains(&config.volume) {
            return Err(SynthError::VolumeOutOfRange(config.volume));
        }

        let mut master = AutomationTimeline::new(1.0);
        let initial = AutomationEvent::SetValue {
            time: graph.now(),
            value: scaled_volume(config.volume),
        };
        master.push(initial);
        graph.submit(GraphCommand::MasterGain(initial));

        tracing::debug!(
            volume = config.volume,
            waveform = %config.waveform,
            "synth created"
        );
        Ok(Self {
            graph,
            voices: Vec::new(),
            master,
            volume: Watch::new(config.volume),
            waveform: Watch::new(config.waveform),
        })
    }

    /// Starts a note at `freq_hz` and returns the handle that stops it.
    ///
    /// Without a stop the note releases on its own after the decay time.
    pub fn start_note(&mut self, freq_hz: f64) -> NoteHandle {
        let now = self.graph.now();
        let index = self.acquire_voice(now);
        let comp = self.waveform.get().gain_compensation();

        let peak = now + ATTACK_TIME_SECS;
        let max_release = peak + DECAY_TIME_SECS;
        let end = max_release + RELEASE_TIME_SECS;

        let voice = &mut self.voices[index];
        voice.generation += 1;
        voice.busy_until = end;
        voice.released = false;
        let chain = voice.chain;

        self.graph.submit(GraphCommand::SetFrequency { chain, freq_hz });
        self.reschedule(
            index,
            now,
            &[
                AutomationEvent::SetValue { time: now, value: 0.0 },
                AutomationEvent::LinearRamp { time: peak, value: comp },
                AutomationEvent::LinearRamp {
                    time: max_release,
                    value: SUSTAIN_LEVEL * comp,
                },
                AutomationEvent::LinearRamp { time: end, value: 0.0 },
            ],
        );
        self.graph.submit(GraphCommand::StartOscillator { chain, time: now });
        self.graph.submit(GraphCommand::StopOscillator { chain, time: end });

        tracing::debug!(voice = index, freq_hz, "note started");
        NoteHandle {
            voice: index,
            generation: self.voices[index].generation,
            freq_hz,
            stopped: false,
        }
    }

    /// Releases a note. Calling it again, or after its voice has been
    /// handed to another note, does nothing.
    pub fn stop_note(&mut self, note: &mut NoteHandle) {
        if note.stopped {
            return;
        }
        note.stopped = true;

        let current = self
            .voices
            .get(note.voice)
            .is_some_and(|v| v.generation == note.generation);
        if !current {
            tracing::trace!(voice = note.voice, "stale note handle, voice already reused");
            return;
        }
        let now = self.graph.now();
        self.release_voice(note.voice, now);
        tracing::debug!(voice = note.voice, freq_hz = note.freq_hz, "note stopped");
    }

    /// Releases every sounding voice. Outstanding handles become stale.
    pub fn all_notes_off(&mut self) {
        let now = self.graph.now();
        let mut released = 0;
        for index in 0..self.voices.len() {
            let voice = &mut self.voices[index];
            if voice.released || now >= voice.busy_until {
                continue;
            }
            voice.generation += 1;
            self.release_voice(index, now);
            released += 1;
        }
        tracing::debug!(released, "all notes off");
    }

    /// Sets the master volume, ramping over the attack time.
    pub fn set_volume(&mut self, normalized: f32) -> Result<(), SynthError> {
        if !(0.0..=1.0).contains(&normalized) {
            return Err(SynthError::VolumeOutOfRange(normalized));
        }
        let now = self.graph.now();
        let current = self.master.value_at(now);
        let events = [
            AutomationEvent::SetValue { time: now, value: current },
            AutomationEvent::LinearRamp {
                time: now + ATTACK_TIME_SECS,
                value: scaled_volume(normalized),
            },
        ];

        self.master.prune_before(now);
        self.master.cancel_scheduled_values(now);
        self.graph.submit(GraphCommand::CancelMasterGain { from: now });
        for event in events {
            self.master.push(event);
            self.graph.submit(GraphCommand::MasterGain(event));
        }
        self.volume.set(normalized);
        tracing::debug!(volume = normalized, "volume set");
        Ok(())
    }

    /// Switches the waveform of every allocated voice and of future voices.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        for voice in &self.voices {
            self.graph.submit(GraphCommand::SetWaveform {
                chain: voice.chain,
                waveform,
            });
        }
        self.waveform.set(waveform);
        tracing::debug!(%waveform, "waveform set");
    }

    /// Volume changes, starting with the current volume.
    pub fn volume(&self) -> Subscription<f32> {
        self.volume.subscribe()
    }

    /// Waveform changes, starting with the current waveform.
    pub fn waveform(&self) -> Subscription<Waveform> {
        self.waveform.subscribe()
    }

    /// Current normalized volume.
    pub fn current_volume(&self) -> f32 {
        self.volume.get()
    }

    /// Current waveform.
    pub fn current_waveform(&self) -> Waveform {
        self.waveform.get()
    }

    /// Number of voices allocated so far.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Number of voices still inside their busy window.
    pub fn busy_voices(&self) -> usize {
        let now = self.graph.now();
        self.voices.iter().filter(|v| now < v.busy_until).count()
    }

    /// Audio-clock time at which a voice becomes reusable.
    pub fn voice_busy_until(&self, voice: usize) -> Option<f64> {
        self.voices.get(voice).map(|v| v.busy_until)
    }

    /// Graph chain backing a voice.
    pub fn voice_chain(&self, voice: usize) -> Option<ChainId> {
        self.voices.get(voice).map(|v| v.chain)
    }

    /// The underlying graph.
    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// The underlying graph, mutably (e.g. to render offline).
    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    fn acquire_voice(&mut self, now: f64) -> usize {
        if let Some(index) = self.voices.iter().position(|v| now >= v.busy_until) {
            tracing::trace!(voice = index, "reusing free voice");
            return index;
        }

        let chain = self.graph.create_chain(self.waveform.get());
        self.voices.push(Voice {
            chain,
            envelope: AutomationTimeline::new(0.0),
            busy_until: 0.0,
            generation: 0,
            released: false,
        });
        let index = self.voices.len() - 1;
        tracing::debug!(voice = index, "voice allocated");
        index
    }

    fn release_voice(&mut self, index: usize, now: f64) {
        let current = self.voices[index].envelope.value_at(now);
        let release_end = now + RELEASE_TIME_SECS;
        let safe_stop = release_end + STOP_TIME_SECS;

        self.reschedule(
            index,
            now,
            &[
                AutomationEvent::SetValue { time: now, value: current },
                AutomationEvent::ExponentialRamp {
                    time: release_end,
                    value: NEAR_SILENCE,
                },
                AutomationEvent::LinearRamp {
                    time: safe_stop,
                    value: 0.0,
                },
            ],
        );
        let voice = &mut self.voices[index];
        voice.busy_until = safe_stop;
        voice.released = true;
        let chain = voice.chain;
        self.graph.submit(GraphCommand::StopOscillator {
            chain,
            time: safe_stop,
        });
    }

    /// Cancels a voice's automation from `now` and schedules `events`,
    /// on both the graph and the local copy.
    fn reschedule(&mut self, index: usize, now: f64, events: &[AutomationEvent]) {
        let voice = &mut self.voices[index];
        let chain = voice.chain;
        voice.envelope.prune_before(now);
        voice.envelope.cancel_scheduled_values(now);
        self.graph.submit(GraphCommand::CancelGain { chain, from: now });
        for &event in events {
            voice.envelope.push(event);
            self.graph.submit(GraphCommand::Gain { chain, event });
        }
    }
}

impl<G: AudioGraph> NotePlayer for Synth<G> {
    type Note = NoteHandle;

    fn start_note(&mut self, freq_hz: f64) -> NoteHandle {
        Synth::start_note(self, freq_hz)
    }

    fn stop_note(&mut self, note: &mut NoteHandle) {
        Synth::stop_note(self, note);
    }

    fn all_notes_off(&mut self) {
        Synth::all_notes_off(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderGraph;

    fn synth() -> Synth<RenderGraph> {
        Synth::new(RenderGraph::new(48000.0), SynthConfig::default()).unwrap()
    }

    fn advance(synth: &mut Synth<RenderGraph>, secs: f64) {
        synth.graph_mut().render_seconds(secs, 1);
    }

    fn gain(synth: &Synth<RenderGraph>, voice: usize) -> f32 {
        let chain = synth.voice_chain(voice).unwrap();
        synth.graph().chain_gain(chain).unwrap()
    }

    #[test]
    fn test_scaled_volume() {
        assert_eq!(scaled_volume(0.0), 0.0);
        assert_eq!(scaled_volume(0.099), 0.0);
        assert!((scaled_volume(0.1) - db_to_linear(-32.7)).abs() < 1e-6);
        assert!((scaled_volume(0.8) - db_to_linear(-9.6)).abs() < 1e-6);
    }

    #[test]
    fn test_master_gain_initialized() {
        let synth = synth();
        assert!((synth.graph().master_gain() - scaled_volume(0.8)).abs() < 1e-6);
        assert_eq!(synth.current_volume(), 0.8);
        assert_eq!(synth.current_waveform(), Waveform::Square);
    }

    #[test]
    fn test_envelope_shape() {
        let mut synth = synth();
        let _note = synth.start_note(440.0);
        let comp = Waveform::Square.gain_compensation();

        advance(&mut synth, ATTACK_TIME_SECS);
        assert!((gain(&synth, 0) - comp).abs() < 1e-3);

        advance(&mut synth, DECAY_TIME_SECS);
        assert!((gain(&synth, 0) - SUSTAIN_LEVEL * comp).abs() < 1e-3);

        advance(&mut synth, RELEASE_TIME_SECS + 0.01);
        assert_eq!(gain(&synth, 0), 0.0);
        assert_eq!(synth.graph().running_chains(), 0);
    }

    #[test]
    fn test_stop_releases_from_current_gain() {
        let mut synth = synth();
        let mut note = synth.start_note(440.0);
        advance(&mut synth, 0.02);
        let held = gain(&synth, 0);
        assert!(held > 0.0);

        synth.stop_note(&mut note);
        assert!((gain(&synth, 0) - held).abs() < 1e-6);
        assert!(note.is_stopped());

        advance(&mut synth, RELEASE_TIME_SECS);
        assert!(gain(&synth, 0) <= NEAR_SILENCE * 1.01);
        advance(&mut synth, STOP_TIME_SECS + 0.01);
        assert_eq!(gain(&synth, 0), 0.0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut synth = synth();
        let mut note = synth.start_note(300.0);
        advance(&mut synth, 0.1);
        synth.stop_note(&mut note);
        let busy = synth.voice_busy_until(0).unwrap();
        advance(&mut synth, 0.1);
        synth.stop_note(&mut note);
        assert_eq!(synth.voice_busy_until(0), Some(busy));
    }

    #[test]
    fn test_voice_not_reused_during_release() {
        let mut synth = synth();
        let mut first = synth.start_note(200.0);
        synth.stop_note(&mut first);

        let second = synth.start_note(300.0);
        assert_eq!(second.voice(), 1);

        advance(&mut synth, RELEASE_TIME_SECS + STOP_TIME_SECS + 0.01);
        let third = synth.start_note(400.0);
        assert_eq!(third.voice(), 0);
        assert_eq!(synth.voice_count(), 2);
    }

    #[test]
    fn test_stale_handle_does_not_touch_new_note() {
        let mut synth = synth();
        let mut first = synth.start_note(200.0);
        let stale = first.clone();
        synth.stop_note(&mut first);
        advance(&mut synth, 1.0);

        let second = synth.start_note(300.0);
        assert_eq!(second.voice(), first.voice());
        let busy = synth.voice_busy_until(second.voice());
        advance(&mut synth, 0.1);

        let mut stale = stale;
        synth.stop_note(&mut stale);
        assert!(stale.is_stopped());
        assert_eq!(synth.voice_busy_until(second.voice()), busy);
    }

    #[test]
    fn test_sounding_voices_never_reused() {
        let mut synth = synth();
        let notes: Vec<_> = (0..40_u8)
            .map(|i| synth.start_note(100.0 + f64::from(i)))
            .collect();
        advance(&mut synth, 0.5);

        let gains: Vec<f32> = (0..synth.voice_count()).map(|v| gain(&synth, v)).collect();
        let now = synth.graph().now();
        let extra = synth.start_note(1000.0);

        assert!(notes.iter().all(|n| n.voice() != extra.voice()));
        assert_eq!(synth.voice_count(), 41);
        for (voice, before) in gains.iter().enumerate() {
            assert!(now < synth.voice_busy_until(voice).unwrap());
            assert!((gain(&synth, voice) - before).abs() < 1e-6, "voice {voice} was cut");
        }
    }

    #[test]
    fn test_set_volume_validates_and_ramps() {
        let mut synth = synth();
        let volume = synth.volume();
        assert_eq!(volume.try_recv(), Some(0.8));

        assert_eq!(synth.set_volume(1.5), Err(SynthError::VolumeOutOfRange(1.5)));
        assert!(synth.set_volume(f32::NAN).is_err());

        synth.set_volume(0.05).unwrap();
        assert_eq!(volume.try_recv(), Some(0.05));
        advance(&mut synth, ATTACK_TIME_SECS / 2.0);
        assert!(synth.graph().master_gain() > 0.0);
        advance(&mut synth, ATTACK_TIME_SECS);
        assert_eq!(synth.graph().master_gain(), 0.0);
    }

    #[test]
    fn test_set_waveform_updates_voices() {
        let mut synth = synth();
        let waveform = synth.waveform();
        let _note = synth.start_note(440.0);
        synth.set_waveform(Waveform::Sine);
        assert_eq!(waveform.latest(), Some(Waveform::Sine));

        let second = synth.start_note(550.0);
        advance(&mut synth, ATTACK_TIME_SECS);
        assert!((gain(&synth, second.voice()) - Waveform::Sine.gain_compensation()).abs() < 1e-3);
    }

    #[test]
    fn test_all_notes_off() {
        let mut synth = synth();
        let mut notes: Vec<_> = (0..4_u8).map(|i| synth.start_note(200.0 + f64::from(i))).collect();
        advance(&mut synth, 0.1);
        synth.all_notes_off();
        advance(&mut synth, RELEASE_TIME_SECS + STOP_TIME_SECS + 0.01);
        assert_eq!(synth.busy_voices(), 0);
        assert_eq!(synth.graph().running_chains(), 0);

        // Handles from before the panic are stale.
        let fresh = synth.start_note(500.0);
        synth.stop_note(&mut notes[fresh.voice()]);
        assert!(synth.voice_busy_until(fresh.voice()).unwrap() > 10.0);
    }
}
