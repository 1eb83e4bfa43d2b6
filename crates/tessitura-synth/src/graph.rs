//! Control-side view of the audio-processing graph.
//!
//! The graph is a set of voice chains (oscillator → gain) summed into a
//! master gain and a limiter. Control code never touches samples: it issues
//! [`GraphCommand`]s stamped with audio-clock times through an
//! [`AudioGraph`], and the renderer applies them on the audio thread.
//!
//! ```text
//!  control thread                         audio thread
//! ┌──────────────┐   GraphCommand    ┌──────────────────────┐
//! │ Synth        │ ────────────────► │ RenderGraph          │
//! │  GraphLink   │  (crossbeam)      │  chains → master →   │
//! │              │ ◄──────────────── │  limiter → output    │
//! └──────────────┘   AudioClock      └──────────────────────┘
//!                   (atomic frames)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Sender;

use crate::automation::AutomationEvent;
use crate::oscillator::Waveform;

/// Identifies one oscillator → gain chain in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub u32);

/// A mutation of the audio graph, applied by the renderer in order.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphCommand {
    /// Adds a silent, stopped chain.
    CreateChain {
        /// Id chosen by the sender.
        chain: ChainId,
        /// Initial oscillator waveform.
        waveform: Waveform,
    },
    /// Changes a chain's oscillator frequency.
    SetFrequency {
        /// Target chain.
        chain: ChainId,
        /// Frequency in Hz.
        freq_hz: f64,
    },
    /// Changes a chain's oscillator waveform.
    SetWaveform {
        /// Target chain.
        chain: ChainId,
        /// New waveform.
        waveform: Waveform,
    },
    /// Schedules an event on a chain's gain.
    Gain {
        /// Target chain.
        chain: ChainId,
        /// Event to schedule.
        event: AutomationEvent,
    },
    /// Cancels a chain's gain events at or after `from`.
    CancelGain {
        /// Target chain.
        chain: ChainId,
        /// Audio-clock time in seconds.
        from: f64,
    },
    /// Starts (or restarts) a chain's oscillator at `time`.
    StartOscillator {
        /// Target chain.
        chain: ChainId,
        /// Audio-clock time in seconds.
        time: f64,
    },
    /// Stops a chain's oscillator at `time`.
    StopOscillator {
        /// Target chain.
        chain: ChainId,
        /// Audio-clock time in seconds.
        time: f64,
    },
    /// Schedules an event on the master gain.
    MasterGain(AutomationEvent),
    /// Cancels master gain events at or after `from`.
    CancelMasterGain {
        /// Audio-clock time in seconds.
        from: f64,
    },
}

/// Something the voice pool can schedule against.
pub trait AudioGraph {
    /// Current audio-clock time in seconds.
    fn now(&self) -> f64;

    /// Allocates a new chain with the given waveform.
    fn create_chain(&mut self, waveform: Waveform) -> ChainId;

    /// Applies or forwards a command.
    fn submit(&mut self, command: GraphCommand);
}

/// Frame counter shared between the renderer and its control handles.
#[derive(Debug, Clone)]
pub struct AudioClock {
    frames: Arc<AtomicU64>,
    sample_rate: f64,
}

impl AudioClock {
    /// Clock at frame zero.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate: f64::from(sample_rate),
        }
    }

    /// Seconds elapsed since the renderer started.
    pub fn now(&self) -> f64 {
        self.frames() as f64 / self.sample_rate
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub(crate) fn store(&self, frames: u64) {
        self.frames.store(frames, Ordering::Release);
    }
}

/// Control-thread handle to a [`RenderGraph`](crate::RenderGraph) running
/// elsewhere, usually inside an audio callback.
#[derive(Debug)]
pub struct GraphLink {
    tx: Sender<GraphCommand>,
    clock: AudioClock,
    next_chain: u32,
}

impl GraphLink {
    pub(crate) fn new(tx: Sender<GraphCommand>, clock: AudioClock) -> Self {
        Self {
            tx,
            clock,
            next_chain: 0,
        }
    }

    /// The renderer's clock.
    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    /// Commands sent but not yet picked up by the renderer.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}

impl AudioGraph for GraphLink {
    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn create_chain(&mut self, waveform: Waveform) -> ChainId {
        let chain = ChainId(self.next_chain);
        self.next_chain += 1;
        self.submit(GraphCommand::CreateChain { chain, waveform });
        chain
    }

    fn submit(&mut self, command: GraphCommand) {
        if self.tx.send(command).is_err() {
            tracing::trace!("render graph disconnected, command dropped");
        }
    }
}
