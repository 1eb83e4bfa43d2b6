//! Master-bus limiter.
//!
//! A feed-forward peak compressor at the end of the graph that keeps many
//! simultaneous voices from clipping:
//!
//! ```text
//! Input → Peak Detector → Gain Computer → Gain Reduction → Output
//! ```
//!
//! | Parameter | Value |
//! |-----------|-------|
//! | Threshold | -1 dB |
//! | Ratio | 20:1 |
//! | Attack | instant |
//! | Release | 100 ms |
//! | Knee | hard |

use tessitura_core::{db_to_linear, linear_to_db};

/// Threshold in dBFS.
pub const LIMITER_THRESHOLD_DB: f32 = -1.0;
/// Compression ratio above the threshold.
pub const LIMITER_RATIO: f32 = 20.0;
/// Release time in seconds.
pub const LIMITER_RELEASE_SECS: f32 = 0.1;

/// Peak limiter with instant attack and one-pole release.
#[derive(Debug, Clone)]
pub struct Limiter {
    threshold_db: f32,
    ratio: f32,
    release_coeff: f32,
    envelope: f32,
    last_gain_reduction_db: f32,
}

impl Limiter {
    /// Limiter with the master-bus settings.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            threshold_db: LIMITER_THRESHOLD_DB,
            ratio: LIMITER_RATIO,
            release_coeff: (-1.0 / (LIMITER_RELEASE_SECS * sample_rate)).exp(),
            envelope: 0.0,
            last_gain_reduction_db: 0.0,
        }
    }

    /// Hard-knee gain computer: reduction in dB for an input level.
    #[inline]
    fn compute_gain_db(&self, input_db: f32) -> f32 {
        let overshoot = input_db - self.threshold_db;
        if overshoot <= 0.0 {
            0.0
        } else {
            -overshoot * (1.0 - 1.0 / self.ratio)
        }
    }

    /// Processes one sample frame; every channel shares the same gain.
    #[inline]
    pub fn process_frame(&mut self, frame: &mut [f32]) {
        let peak = frame.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
        self.envelope = if peak > self.envelope {
            peak
        } else {
            peak + self.release_coeff * (self.envelope - peak)
        };
        let gain_db = self.compute_gain_db(linear_to_db(self.envelope));
        self.last_gain_reduction_db = gain_db;
        if gain_db < 0.0 {
            let gain = db_to_linear(gain_db);
            for sample in frame.iter_mut() {
                *sample *= gain;
            }
        }
    }

    /// Last gain reduction in dB (zero or negative).
    pub fn gain_reduction_db(&self) -> f32 {
        self.last_gain_reduction_db
    }

    /// Clears the detector.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.last_gain_reduction_db = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_signal_passes() {
        let mut limiter = Limiter::new(48000.0);
        let mut frame = [0.5_f32, -0.5];
        limiter.process_frame(&mut frame);
        assert_eq!(frame, [0.5, -0.5]);
        assert_eq!(limiter.gain_reduction_db(), 0.0);
    }

    #[test]
    fn test_loud_signal_is_pulled_down_immediately() {
        let mut limiter = Limiter::new(48000.0);
        // +6 dB over the threshold: 7 dB over, 6.65 dB of reduction.
        let mut frame = [db_to_linear(6.0)];
        limiter.process_frame(&mut frame);
        let out_db = linear_to_db(frame[0]);
        let expected = LIMITER_THRESHOLD_DB + 7.0 / LIMITER_RATIO;
        assert!((out_db - expected).abs() < 0.01, "got {out_db} dB");
    }

    #[test]
    fn test_release_recovers() {
        let mut limiter = Limiter::new(48000.0);
        limiter.process_frame(&mut [4.0]);
        assert!(limiter.gain_reduction_db() < -10.0);
        for _ in 0..48000 {
            limiter.process_frame(&mut [0.1]);
        }
        assert_eq!(limiter.gain_reduction_db(), 0.0);
    }
}
