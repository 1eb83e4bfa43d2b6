//! Tuning snapshot consumed by the frequency mapper.
//!
//! A [`Tuning`] is a read-only value: callers build a new one whenever the
//! tuning changes and hand it to [`TuningData::update`](crate::TuningData::update).
//! It derives serde so that a player configuration can embed one:
//!
//! ```toml
//! root_freq_hz = 261.6256
//! octaves_spanned = 1
//! degrees = [{ ratio = [1, 1] }, { ratio = [9, 8] }, { cents = 386.3 }]
//!
//! [mapping]
//! root_key = 60
//! key_span = 3
//! keys = [0, 1, 2]
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::cents_to_ratio;

/// Errors reported by [`Tuning::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuningError {
    /// The scale has no degrees at all.
    #[error("tuning has no scale degrees")]
    EmptyScale,

    /// Degree 0 must be the root itself (ratio 1/1).
    #[error("degree 0 must be the unison, got ratio {0}")]
    RootNotUnison(f64),

    /// Root frequency is not a positive finite number.
    #[error("root frequency must be positive and finite, got {0}")]
    InvalidRootFrequency(f64),

    /// `octaves_spanned` must be at least 1.
    #[error("octaves spanned must be at least 1")]
    InvalidOctaves,

    /// `key_span` must be at least 1.
    #[error("key span must be at least 1")]
    InvalidKeySpan,

    /// The mapping lists a different number of keys than its span.
    #[error("mapping lists {actual} keys but spans {expected}")]
    MappingLength {
        /// Declared key span.
        expected: u32,
        /// Number of entries in `keys`.
        actual: usize,
    },

    /// A mapped key refers to a degree the scale does not have.
    #[error("key offset {key} maps to degree {degree}, scale has {len} degrees")]
    DegreeOutOfRange {
        /// Key offset within the span.
        key: usize,
        /// Referenced degree index.
        degree: usize,
        /// Number of degrees in the scale.
        len: usize,
    },

    /// An interval does not describe a positive finite ratio.
    #[error("degree {0} has an invalid interval")]
    InvalidInterval(usize),
}

/// Interval of a scale degree above the root.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// Just ratio `numerator / denominator`.
    Ratio(u64, u64),
    /// Interval in cents (1200 per octave).
    Cents(f64),
}

impl Interval {
    /// Unison, the interval of degree 0.
    pub const UNISON: Self = Self::Ratio(1, 1);

    /// Frequency ratio above the root.
    ///
    /// A zero denominator yields infinity; [`Tuning::validate`] rejects it.
    pub fn ratio(&self) -> f64 {
        match *self {
            Self::Ratio(num, den) => num as f64 / den as f64,
            Self::Cents(cents) => cents_to_ratio(cents),
        }
    }

    /// Size of the interval in cents.
    pub fn cents(&self) -> f64 {
        match *self {
            Self::Ratio(..) => crate::math::ratio_to_cents(self.ratio()),
            Self::Cents(cents) => cents,
        }
    }

    fn is_valid(&self) -> bool {
        match *self {
            Self::Ratio(num, den) => num > 0 && den > 0,
            Self::Cents(cents) => cents.is_finite(),
        }
    }
}

/// Periodic assignment of keyboard keys to scale degrees.
///
/// `keys[k]` is the degree sounded by the key `k` positions above
/// `root_key` (modulo `key_span`), or `None` when that key is silent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    /// Absolute pitch where the primary span starts. May lie outside 0..=127.
    pub root_key: i32,
    /// Number of keys in one repetition of the mapping.
    pub key_span: u32,
    /// Degree per key offset; serialized with `-1` for unmapped keys.
    #[serde(with = "unmapped_as_negative")]
    pub keys: Vec<Option<usize>>,
}

impl Mapping {
    /// Maps key offset `k` to degree `k` for `span` keys.
    pub fn identity(root_key: i32, span: u32) -> Self {
        Self {
            root_key,
            key_span: span,
            keys: (0..span as usize).map(Some).collect(),
        }
    }

    /// Degree assigned to a key offset inside the primary span.
    pub fn degree_for_key(&self, key_offset: usize) -> Option<usize> {
        self.keys.get(key_offset).copied().flatten()
    }
}

/// Read-only tuning snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    /// Frequency of degree 0 at the root key, in Hz.
    pub root_freq_hz: f64,
    /// Octaves the keyboard transposes by each time the mapping wraps.
    pub octaves_spanned: u32,
    /// Interval of every degree from the root. Degree 0 is the root.
    pub degrees: Vec<Interval>,
    /// Keyboard mapping.
    pub mapping: Mapping,
}

impl Default for Tuning {
    fn default() -> Self {
        Self::twelve_tet()
    }
}

impl Tuning {
    /// Middle C in 12-TET at A4 = 440 Hz.
    pub const MIDDLE_C_HZ: f64 = 261.6256;

    /// Twelve-tone equal temperament rooted on middle C (pitch 60).
    pub fn twelve_tet() -> Self {
        Self::equal_temperament(12, Self::MIDDLE_C_HZ, 60)
    }

    /// `steps` equal divisions of the octave with an identity mapping.
    pub fn equal_temperament(steps: u32, root_freq_hz: f64, root_key: i32) -> Self {
        let step = 1200.0 / f64::from(steps.max(1));
        let degrees = (0..steps)
            .map(|i| {
                if i == 0 {
                    Interval::UNISON
                } else {
                    Interval::Cents(step * f64::from(i))
                }
            })
            .collect();
        Self {
            root_freq_hz,
            octaves_spanned: 1,
            degrees,
            mapping: Mapping::identity(root_key, steps),
        }
    }

    /// Frequency of a scale degree in the primary span.
    pub fn degree_frequency(&self, degree: usize) -> Option<f64> {
        self.degrees
            .get(degree)
            .map(|interval| self.root_freq_hz * interval.ratio())
    }

    /// Checks every structural invariant of the snapshot.
    pub fn validate(&self) -> Result<(), TuningError> {
        if !(self.root_freq_hz.is_finite() && self.root_freq_hz > 0.0) {
            return Err(TuningError::InvalidRootFrequency(self.root_freq_hz));
        }
        if self.octaves_spanned == 0 {
            return Err(TuningError::InvalidOctaves);
        }
        let Some(root) = self.degrees.first() else {
            return Err(TuningError::EmptyScale);
        };
        if let Some(index) = self.degrees.iter().position(|d| !d.is_valid()) {
            return Err(TuningError::InvalidInterval(index));
        }
        if (root.ratio() - 1.0).abs() > 1e-9 {
            return Err(TuningError::RootNotUnison(root.ratio()));
        }

        let mapping = &self.mapping;
        if mapping.key_span == 0 {
            return Err(TuningError::InvalidKeySpan);
        }
        if mapping.keys.len() != mapping.key_span as usize {
            return Err(TuningError::MappingLength {
                expected: mapping.key_span,
                actual: mapping.keys.len(),
            });
        }
        for (key, degree) in mapping.keys.iter().enumerate() {
            if let Some(degree) = *degree
                && degree >= self.degrees.len()
            {
                return Err(TuningError::DegreeOutOfRange {
                    key,
                    degree,
                    len: self.degrees.len(),
                });
            }
        }
        Ok(())
    }
}

mod unmapped_as_negative {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(keys: &[Option<usize>], s: S) -> Result<S::Ok, S::Error> {
        keys.iter()
            .map(|k| k.map_or(-1, |d| d as i64))
            .collect::<Vec<_>>()
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Option<usize>>, D::Error> {
        let raw = Vec::<i64>::deserialize(d)?;
        Ok(raw
            .into_iter()
            .map(|k| usize::try_from(k).ok())
            .collect())
    }
}
