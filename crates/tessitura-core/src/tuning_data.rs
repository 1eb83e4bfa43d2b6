//! Tuning-data service: the current tuning and its lookup table.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::mapper::{FrequencyTable, compute_lookup_table};
use crate::observable::{Broadcast, Subscription};
use crate::tuning::{Tuning, TuningError};

/// Everything derived from one tuning, swapped as a unit.
#[derive(Debug)]
struct Snapshot {
    tuning: Arc<Tuning>,
    table: Arc<FrequencyTable>,
    version: u64,
}

/// Owns the current [`Tuning`] and its [`FrequencyTable`].
///
/// Readers call [`TuningData::table`] and keep the returned `Arc` for as
/// long as they like; [`TuningData::update`] builds the replacement table
/// off to the side and publishes it with a single atomic swap, so readers
/// never see a half-built table and never take a lock.
#[derive(Debug)]
pub struct TuningData {
    current: ArcSwap<Snapshot>,
    changes: Broadcast<u64>,
}

impl Default for TuningData {
    fn default() -> Self {
        Self::from_valid(Tuning::twelve_tet())
    }
}

impl TuningData {
    /// Validates `tuning` and computes its first table.
    pub fn new(tuning: Tuning) -> Result<Self, TuningError> {
        tuning.validate()?;
        Ok(Self::from_valid(tuning))
    }

    fn from_valid(tuning: Tuning) -> Self {
        let table = compute_lookup_table(&tuning);
        Self {
            current: ArcSwap::from_pointee(Snapshot {
                tuning: Arc::new(tuning),
                table: Arc::new(table),
                version: 0,
            }),
            changes: Broadcast::new(),
        }
    }

    /// Replaces the tuning and publishes the recomputed table.
    ///
    /// Subscribers of [`TuningData::changes`] receive the new version number.
    /// An invalid tuning leaves the current table in place.
    pub fn update(&self, tuning: Tuning) -> Result<Arc<FrequencyTable>, TuningError> {
        tuning.validate()?;
        let table = Arc::new(compute_lookup_table(&tuning));
        let version = self.version() + 1;
        self.current.store(Arc::new(Snapshot {
            tuning: Arc::new(tuning),
            table: Arc::clone(&table),
            version,
        }));
        tracing::info!(version, mapped = table.mapped_count(), "tuning updated");
        self.changes.publish(version);
        Ok(table)
    }

    /// Current lookup table.
    pub fn table(&self) -> Arc<FrequencyTable> {
        Arc::clone(&self.current.load().table)
    }

    /// Current tuning.
    pub fn tuning(&self) -> Arc<Tuning> {
        Arc::clone(&self.current.load().tuning)
    }

    /// Monotonic counter bumped by every successful update.
    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    /// Version, tuning and table from the same update.
    pub fn load(&self) -> (u64, Arc<Tuning>, Arc<FrequencyTable>) {
        let snapshot = self.current.load();
        (
            snapshot.version,
            Arc::clone(&snapshot.tuning),
            Arc::clone(&snapshot.table),
        )
    }

    /// Stream of versions published by later updates.
    pub fn changes(&self) -> Subscription<u64> {
        self.changes.subscribe()
    }
}
