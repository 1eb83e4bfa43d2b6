//! Sample renderer for the audio graph.

use crossbeam_channel::Receiver;

use crate::automation::AutomationTimeline;
use crate::graph::{AudioClock, AudioGraph, ChainId, GraphCommand, GraphLink};
use crate::limiter::Limiter;
use crate::oscillator::{Oscillator, Waveform};

#[derive(Debug, Clone)]
struct Chain {
    osc: Oscillator,
    gain: AutomationTimeline,
    start_at: Option<f64>,
    stop_at: Option<f64>,
}

impl Chain {
    fn new(sample_rate: f32, waveform: Waveform) -> Self {
        let mut osc = Oscillator::new(sample_rate);
        osc.set_waveform(waveform);
        Self {
            osc,
            gain: AutomationTimeline::new(0.0),
            start_at: None,
            stop_at: None,
        }
    }

    #[inline]
    fn is_running(&self, t: f64) -> bool {
        self.start_at.is_some_and(|start| start <= t) && self.stop_at.is_none_or(|stop| t < stop)
    }
}

/// Renders the graph: every running chain, summed, through the master gain
/// and the limiter.
///
/// Used in two ways:
///
/// - Inside an audio callback, fed by a [`GraphLink`] created with
///   [`RenderGraph::linked`].
/// - Directly as an [`AudioGraph`] for offline rendering, where commands
///   apply immediately and time only moves when [`RenderGraph::render`] runs.
///
/// # Example
///
/// ```rust
/// use tessitura_synth::{RenderGraph, Synth, SynthConfig};
///
/// let mut synth = Synth::new(RenderGraph::new(48000.0), SynthConfig::default()).unwrap();
/// let mut note = synth.start_note(440.0);
/// let mut block = vec![0.0_f32; 4800];
/// synth.graph_mut().render(&mut block, 1);
/// synth.stop_note(&mut note);
/// ```
#[derive(Debug)]
pub struct RenderGraph {
    sample_rate: f32,
    frame: u64,
    clock: AudioClock,
    commands: Option<Receiver<GraphCommand>>,
    chains: Vec<Option<Chain>>,
    master: AutomationTimeline,
    limiter: Limiter,
    next_chain: u32,
}

impl RenderGraph {
    /// Standalone renderer that only takes commands through [`AudioGraph`].
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frame: 0,
            clock: AudioClock::new(sample_rate),
            commands: None,
            chains: Vec::new(),
            master: AutomationTimeline::new(1.0),
            limiter: Limiter::new(sample_rate),
            next_chain: 0,
        }
    }

    /// Renderer plus a control handle that feeds it over a channel.
    pub fn linked(sample_rate: f32) -> (Self, GraphLink) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut graph = Self::new(sample_rate);
        graph.commands = Some(rx);
        let link = GraphLink::new(tx, graph.clock.clone());
        (graph, link)
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Shared clock, advanced at the end of every block.
    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    /// Number of chains created so far.
    pub fn chain_count(&self) -> usize {
        self.chains.iter().flatten().count()
    }

    /// Number of chains whose oscillator is running at the current time.
    pub fn running_chains(&self) -> usize {
        let t = self.now();
        self.chains.iter().flatten().filter(|c| c.is_running(t)).count()
    }

    /// Current gain of a chain, if it exists.
    pub fn chain_gain(&self, chain: ChainId) -> Option<f32> {
        let t = self.now();
        self.chain(chain).map(|c| c.gain.value_at(t))
    }

    /// Current master gain.
    pub fn master_gain(&self) -> f32 {
        self.master.value_at(self.now())
    }

    /// Current frequency of a chain, if it exists.
    pub fn chain_frequency(&self, chain: ChainId) -> Option<f32> {
        self.chain(chain).map(|c| c.osc.frequency())
    }

    fn chain(&self, chain: ChainId) -> Option<&Chain> {
        self.chains.get(chain.0 as usize).and_then(Option::as_ref)
    }

    fn chain_mut(&mut self, chain: ChainId) -> Option<&mut Chain> {
        let found = self.chains.get_mut(chain.0 as usize).and_then(Option::as_mut);
        if found.is_none() {
            tracing::trace!(chain = chain.0, "command for unknown chain ignored");
        }
        found
    }

    fn apply(&mut self, command: GraphCommand) {
        match command {
            GraphCommand::CreateChain { chain, waveform } => {
                let index = chain.0 as usize;
                if index >= self.chains.len() {
                    self.chains.resize_with(index + 1, || None);
                }
                self.chains[index] = Some(Chain::new(self.sample_rate, waveform));
                self.next_chain = self.next_chain.max(chain.0 + 1);
            }
            GraphCommand::SetFrequency { chain, freq_hz } => {
                if let Some(c) = self.chain_mut(chain) {
                    c.osc.set_frequency(freq_hz as f32);
                }
            }
            GraphCommand::SetWaveform { chain, waveform } => {
                if let Some(c) = self.chain_mut(chain) {
                    c.osc.set_waveform(waveform);
                }
            }
            GraphCommand::Gain { chain, event } => {
                if let Some(c) = self.chain_mut(chain) {
                    c.gain.push(event);
                }
            }
            GraphCommand::CancelGain { chain, from } => {
                if let Some(c) = self.chain_mut(chain) {
                    c.gain.cancel_scheduled_values(from);
                }
            }
            GraphCommand::StartOscillator { chain, time } => {
                if let Some(c) = self.chain_mut(chain) {
                    c.osc.reset();
                    c.start_at = Some(time);
                    c.stop_at = None;
                }
            }
            GraphCommand::StopOscillator { chain, time } => {
                if let Some(c) = self.chain_mut(chain) {
                    c.stop_at = Some(time);
                }
            }
            GraphCommand::MasterGain(event) => self.master.push(event),
            GraphCommand::CancelMasterGain { from } => self.master.cancel_scheduled_values(from),
        }
    }

    fn drain_commands(&mut self) {
        let Some(rx) = self.commands.take() else {
            return;
        };
        while let Ok(command) = rx.try_recv() {
            self.apply(command);
        }
        self.commands = Some(rx);
    }

    /// Renders one interleaved block of `out.len() / channels` frames.
    ///
    /// Pending commands are applied first; the shared clock advances by the
    /// number of frames rendered.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        self.drain_commands();
        let channels = channels.max(1);
        let sr = f64::from(self.sample_rate);

        for frame in out.chunks_exact_mut(channels) {
            let t = self.frame as f64 / sr;
            let mut mix = 0.0_f32;
            for chain in self.chains.iter_mut().flatten() {
                if chain.is_running(t) {
                    mix += chain.osc.advance() * chain.gain.value_at(t);
                }
            }
            mix *= self.master.value_at(t);
            frame.fill(mix);
            self.limiter.process_frame(frame);
            self.frame += 1;
        }

        let now = self.frame as f64 / sr;
        for chain in self.chains.iter_mut().flatten() {
            chain.gain.prune_before(now);
            if chain.stop_at.is_some_and(|stop| stop <= now) {
                chain.start_at = None;
                chain.stop_at = None;
            }
        }
        self.master.prune_before(now);
        self.clock.store(self.frame);
    }

    /// Renders `secs` seconds into a new interleaved buffer.
    pub fn render_seconds(&mut self, secs: f64, channels: usize) -> Vec<f32> {
        let frames = (secs.max(0.0) * f64::from(self.sample_rate)).round() as usize;
        let mut out = vec![0.0; frames * channels.max(1)];
        self.render(&mut out, channels);
        out
    }
}

impl AudioGraph for RenderGraph {
    fn now(&self) -> f64 {
        self.frame as f64 / f64::from(self.sample_rate)
    }

    fn create_chain(&mut self, waveform: Waveform) -> ChainId {
        let chain = ChainId(self.next_chain);
        self.apply(GraphCommand::CreateChain { chain, waveform });
        chain
    }

    fn submit(&mut self, command: GraphCommand) {
        self.apply(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::AutomationEvent;

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len().max(1) as f32).sqrt()
    }

    #[test]
    fn test_silent_without_chains() {
        let mut graph = RenderGraph::new(48000.0);
        let out = graph.render_seconds(0.1, 2);
        assert_eq!(out.len(), 9600);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!((graph.now() - 0.1).abs() < 1e-9);
        assert_eq!(graph.clock().frames(), 4800);
    }

    #[test]
    fn test_chain_sounds_between_start_and_stop() {
        let mut graph = RenderGraph::new(48000.0);
        let chain = graph.create_chain(Waveform::Sine);
        graph.submit(GraphCommand::SetFrequency { chain, freq_hz: 440.0 });
        graph.submit(GraphCommand::Gain {
            chain,
            event: AutomationEvent::SetValue { time: 0.0, value: 0.5 },
        });
        graph.submit(GraphCommand::StartOscillator { chain, time: 0.1 });
        graph.submit(GraphCommand::StopOscillator { chain, time: 0.2 });

        let before = graph.render_seconds(0.1, 1);
        assert_eq!(rms(&before), 0.0);
        assert_eq!(graph.running_chains(), 1);

        let during = graph.render_seconds(0.1, 1);
        assert!((rms(&during) - 0.5 / 2.0_f32.sqrt()).abs() < 0.01);

        let after = graph.render_seconds(0.1, 1);
        assert_eq!(rms(&after), 0.0);
        assert_eq!(graph.running_chains(), 0);
    }

    #[test]
    fn test_linked_graph_receives_commands() {
        let (mut graph, mut link) = RenderGraph::linked(48000.0);
        let chain = link.create_chain(Waveform::Square);
        link.submit(GraphCommand::StartOscillator { chain, time: 0.0 });
        assert_eq!(link.pending(), 2);
        assert_eq!(graph.chain_count(), 0);

        let mut block = [0.0_f32; 512];
        graph.render(&mut block, 2);
        assert_eq!(link.pending(), 0);
        assert_eq!(graph.chain_count(), 1);
        assert!((link.now() - 256.0 / 48000.0).abs() < 1e-12);
    }

    #[test]
    fn test_master_gain_scales_output() {
        let mut graph = RenderGraph::new(48000.0);
        let chain = graph.create_chain(Waveform::Sine);
        graph.submit(GraphCommand::Gain {
            chain,
            event: AutomationEvent::SetValue { time: 0.0, value: 0.5 },
        });
        graph.submit(GraphCommand::MasterGain(AutomationEvent::SetValue {
            time: 0.0,
            value: 0.0,
        }));
        graph.submit(GraphCommand::StartOscillator { chain, time: 0.0 });
        let out = graph.render_seconds(0.05, 1);
        assert_eq!(rms(&out), 0.0);
        assert_eq!(graph.master_gain(), 0.0);
    }

    #[test]
    fn test_limiter_caps_many_voices() {
        let mut graph = RenderGraph::new(48000.0);
        for _ in 0..16 {
            let chain = graph.create_chain(Waveform::Square);
            graph.submit(GraphCommand::SetFrequency { chain, freq_hz: 110.0 });
            graph.submit(GraphCommand::Gain {
                chain,
                event: AutomationEvent::SetValue { time: 0.0, value: 0.35 },
            });
            graph.submit(GraphCommand::StartOscillator { chain, time: 0.0 });
        }
        let out = graph.render_seconds(0.2, 1);
        let peak = out.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        // 16 × 0.35 = 5.6 linear (+15 dB); 20:1 above -1 dB leaves about -0.2 dB.
        assert!(peak < 1.0, "peak {peak}");
    }

    #[test]
    fn test_unknown_chain_is_ignored() {
        let mut graph = RenderGraph::new(48000.0);
        graph.submit(GraphCommand::StartOscillator {
            chain: ChainId(7),
            time: 0.0,
        });
        assert_eq!(graph.chain_count(), 0);
        assert_eq!(graph.chain_gain(ChainId(7)), None);
    }
}
