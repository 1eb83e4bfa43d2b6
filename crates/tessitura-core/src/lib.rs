//! Tessitura Core - tuning model and pitch-to-frequency mapping
//!
//! This crate holds the pieces of the playback core that have no audio or
//! MIDI dependency of their own:
//!
//! # Tuning Model
//!
//! - [`Tuning`] - Root frequency, scale degrees, octave span and keyboard mapping
//! - [`Interval`] - A scale degree expressed as a frequency ratio or in cents
//! - [`Mapping`] - Periodic assignment of keyboard keys to scale degrees
//!
//! # Frequency Mapping
//!
//! - [`compute_lookup_table`] - Resolves every MIDI pitch (0..=127) to a frequency
//! - [`FrequencyTable`] - Immutable dense table of [`MappedSound`] entries
//! - [`TuningData`] - Holds the current tuning and swaps its table atomically
//!
//! # Observables
//!
//! - [`Watch`] - Replay-latest value: new subscribers receive the current value
//! - [`Broadcast`] - Fire-and-forget event stream without replay
//!
//! # Example
//!
//! ```rust
//! use tessitura_core::{Tuning, compute_lookup_table};
//!
//! let table = compute_lookup_table(&Tuning::twelve_tet());
//! let a4 = table.frequency(69).unwrap();
//! assert!((a4 - 440.0).abs() < 0.01);
//! ```

pub mod mapper;
pub mod math;
pub mod observable;
pub mod tuning;
pub mod tuning_data;

pub use mapper::{FrequencyTable, KeyPosition, MappedSound, PITCH_RANGE, compute_lookup_table};
pub use math::{cents_to_ratio, db_to_linear, linear_to_db, ratio_to_cents};
pub use observable::{Broadcast, Subscription, Watch};
pub use tuning::{Interval, Mapping, Tuning, TuningError};
pub use tuning_data::TuningData;
