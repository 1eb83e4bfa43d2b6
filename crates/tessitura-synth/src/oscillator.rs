//! Audio-rate oscillators with anti-aliasing.
//!
//! Band-limited oscillators using PolyBLEP (Polynomial Band-Limited Step)
//! to keep the square, sawtooth and triangle shapes from aliasing at the
//! high pitches a microtonal keyboard can reach.

use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Oscillator waveform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    /// Pure fundamental.
    Sine,
    /// Odd harmonics, soft.
    Triangle,
    /// Odd harmonics, hollow. The player default.
    #[default]
    Square,
    /// All harmonics, bright.
    #[serde(alias = "saw")]
    Sawtooth,
}

impl Waveform {
    /// Every waveform, in menu order.
    pub const ALL: [Self; 4] = [Self::Sine, Self::Triangle, Self::Square, Self::Sawtooth];

    /// Peak gain applied to a voice of this shape so that all shapes play at
    /// a similar loudness.
    pub fn gain_compensation(self) -> f32 {
        match self {
            Self::Sine | Self::Triangle => 0.8,
            Self::Sawtooth => 0.45,
            Self::Square => 0.35,
        }
    }

    /// Lowercase name used in configuration and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Triangle => "triangle",
            Self::Square => "square",
            Self::Sawtooth => "sawtooth",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown waveform name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown waveform '{0}' (expected sine, triangle, square or sawtooth)")]
pub struct ParseWaveformError(pub String);

impl FromStr for Waveform {
    type Err = ParseWaveformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sine" | "sin" => Ok(Self::Sine),
            "triangle" | "tri" => Ok(Self::Triangle),
            "square" | "sqr" => Ok(Self::Square),
            "sawtooth" | "saw" => Ok(Self::Sawtooth),
            _ => Err(ParseWaveformError(s.to_string())),
        }
    }
}

/// Audio-rate oscillator with PolyBLEP anti-aliasing.
///
/// # Example
///
/// ```rust
/// use tessitura_synth::{Oscillator, Waveform};
///
/// let mut osc = Oscillator::new(48000.0);
/// osc.set_frequency(440.0);
/// osc.set_waveform(Waveform::Sawtooth);
///
/// let sample = osc.advance();
/// ```
#[derive(Debug, Clone)]
pub struct Oscillator {
    /// Current phase position [0.0, 1.0)
    phase: f32,
    /// Phase increment per sample
    phase_inc: f32,
    sample_rate: f32,
    frequency: f32,
    waveform: Waveform,
    /// Leaky integrator state for the triangle
    integrator: f32,
}

impl Oscillator {
    /// Create an oscillator at 440 Hz.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: 440.0 / sample_rate,
            sample_rate,
            frequency: 440.0,
            waveform: Waveform::default(),
            integrator: 0.0,
        }
    }

    /// Set frequency in Hz. Negative values clamp to 0.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.frequency = freq_hz.max(0.0);
        self.phase_inc = self.frequency / self.sample_rate;
    }

    /// Current frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set waveform.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Current waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Reset phase and integrator state.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.integrator = 0.0;
    }

    /// Generate the next sample.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let output = self.sample_at(self.phase);
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        output
    }

    /// Sine is used directly. Sawtooth and square get PolyBLEP at their
    /// discontinuities. Triangle integrates a PolyBLEP square, since its
    /// discontinuity is in the slope rather than the value.
    #[inline]
    fn sample_at(&mut self, phase: f32) -> f32 {
        let dt = self.phase_inc;
        match self.waveform {
            Waveform::Sine => (phase * TAU).sin(),
            Waveform::Sawtooth => 2.0 * phase - 1.0 - poly_blep(phase, dt),
            Waveform::Square => square(phase, dt),
            Waveform::Triangle => {
                // Frequency-adaptive leak keeps the integrator free of DC drift.
                let leak = 1.0 - dt.min(0.1);
                self.integrator = leak * self.integrator + square(phase, dt) * dt * 4.0;
                self.integrator
            }
        }
    }
}

#[inline]
fn square(phase: f32, dt: f32) -> f32 {
    let naive = if phase < 0.5 { 1.0 } else { -1.0 };
    let falling = (phase + 0.5).fract();
    naive + poly_blep(phase, dt) - poly_blep(falling, dt)
}

/// 4th-order PolyBLEP correction.
///
/// Degree-4 piecewise polynomial fitted to the ideal BLEP residual with C²
/// continuity, spanning two samples on each side of the discontinuity:
///
/// ```text
/// p1(n) = A4 n^4 + A3 n^3 + A2 n^2 + A0   n in [0,1)
/// p2(n) = C (2-n)^4                       n in [1,2)
/// ```
///
/// Reference: Välimäki et al., "Antialiasing Oscillators", IEEE Signal
/// Processing Magazine, 2010.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    const A4: f32 = -43.0 / 48.0;
    const A3: f32 = 7.0 / 6.0;
    const A2: f32 = 0.5;
    const A0: f32 = -1.0;
    const C: f32 = -11.0 / 48.0;

    if dt <= 0.0 {
        return 0.0;
    }
    let residual = |n: f32| {
        if n < 1.0 {
            let n2 = n * n;
            A4 * n2 * n2 + A3 * n2 * n + A2 * n2 + A0
        } else {
            let u = 2.0 - n;
            let u2 = u * u;
            C * u2 * u2
        }
    };

    let window = 2.0 * dt;
    if t < window {
        residual(t / dt)
    } else if t > 1.0 - window {
        -residual((1.0 - t) / dt)
    } else {
        0.0
    }
}
