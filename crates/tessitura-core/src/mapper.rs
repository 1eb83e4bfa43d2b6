//! Pitch-to-frequency mapping.
//!
//! [`compute_lookup_table`] resolves every playable pitch against a
//! [`Tuning`]. The primary span (the `key_span` keys starting at
//! `root_key`) takes its frequencies straight from the scale; every other
//! pitch reuses the primary entry at the same key offset, transposed by
//! `octaves_spanned` octaves per span of distance:
//!
//! ```text
//! delta      = pitch - root_key
//! key_offset = delta mod key_span        (always in 0..key_span)
//! span_index = floor(delta / key_span)
//! freq       = primary[key_offset] * 2^(span_index * octaves_spanned)
//! ```
//!
//! Both operations use Euclidean division so that pitches below the root key
//! land on the right offset and span.

use crate::tuning::Tuning;

/// Number of playable pitches (MIDI 0..=127).
pub const PITCH_RANGE: usize = 128;

/// A pitch that sounds: its frequency and the degree it plays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedSound {
    /// Frequency in Hz.
    pub freq_hz: f64,
    /// Scale degree index.
    pub degree: usize,
}

/// Location of a pitch relative to the mapping's primary span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPosition {
    /// Offset inside the span, always in `0..key_span`.
    pub key_offset: usize,
    /// Signed number of spans from the primary span.
    pub span_index: i64,
}

impl KeyPosition {
    /// Locates `pitch` for a mapping rooted at `root_key` with `key_span` keys.
    ///
    /// Returns `None` when `key_span` is zero.
    ///
    /// ```rust
    /// use tessitura_core::KeyPosition;
    ///
    /// let pos = KeyPosition::locate(4, 5, 12).unwrap();
    /// assert_eq!(pos.key_offset, 11);
    /// assert_eq!(pos.span_index, -1);
    /// ```
    pub fn locate(pitch: i64, root_key: i64, key_span: u32) -> Option<Self> {
        if key_span == 0 {
            return None;
        }
        let span = i64::from(key_span);
        let delta = pitch - root_key;
        Some(Self {
            key_offset: delta.rem_euclid(span) as usize,
            span_index: delta.div_euclid(span),
        })
    }
}

/// Dense table of [`MappedSound`]s indexed by pitch.
///
/// Built once by [`compute_lookup_table`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyTable {
    entries: [Option<MappedSound>; PITCH_RANGE],
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::silent()
    }
}

impl FrequencyTable {
    /// A table with every pitch unmapped.
    pub fn silent() -> Self {
        Self {
            entries: [None; PITCH_RANGE],
        }
    }

    /// Entry for a pitch, `None` when unmapped or outside the range.
    #[inline]
    pub fn get(&self, pitch: u8) -> Option<MappedSound> {
        self.entries.get(usize::from(pitch)).copied().flatten()
    }

    /// Frequency for a pitch.
    #[inline]
    pub fn frequency(&self, pitch: u8) -> Option<f64> {
        self.get(pitch).map(|s| s.freq_hz)
    }

    /// True if the pitch produces a sound.
    #[inline]
    pub fn is_mapped(&self, pitch: u8) -> bool {
        self.get(pitch).is_some()
    }

    /// Iterates `(pitch, entry)` over the whole range.
    pub fn iter(&self) -> impl Iterator<Item = (u8, Option<MappedSound>)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(pitch, entry)| (pitch as u8, *entry))
    }

    /// Number of pitches that produce a sound.
    pub fn mapped_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }
}

/// Resolves every pitch in `0..PITCH_RANGE` against `tuning`.
///
/// Pure and eager. Keys mapped to a degree the scale lacks, or a zero
/// `key_span`, produce unmapped entries rather than an error; use
/// [`Tuning::validate`] to reject such tunings up front.
pub fn compute_lookup_table(tuning: &Tuning) -> FrequencyTable {
    let mapping = &tuning.mapping;
    if mapping.key_span == 0 {
        tracing::warn!("key span is zero, every pitch is unmapped");
        return FrequencyTable::silent();
    }

    let primary: Vec<Option<MappedSound>> = (0..mapping.key_span as usize)
        .map(|key| {
            let degree = mapping.degree_for_key(key)?;
            let freq_hz = tuning.degree_frequency(degree)?;
            Some(MappedSound { freq_hz, degree })
        })
        .collect();

    let octaves = f64::from(tuning.octaves_spanned);
    let mut table = FrequencyTable::silent();
    for (pitch, slot) in table.entries.iter_mut().enumerate() {
        let Some(pos) = KeyPosition::locate(pitch as i64, i64::from(mapping.root_key), mapping.key_span)
        else {
            continue;
        };
        *slot = primary[pos.key_offset].map(|sound| MappedSound {
            freq_hz: sound.freq_hz * (pos.span_index as f64 * octaves).exp2(),
            degree: sound.degree,
        });
    }

    tracing::debug!(
        root_key = mapping.root_key,
        key_span = mapping.key_span,
        mapped = table.mapped_count(),
        "frequency table computed"
    );
    table
}
