//! Versioned storage of chain states.
use std::{collections::HashMap, convert::Infallible, sync::Arc};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::{ChainState, DIDSuffix};

/// Chain state of one suffix, with the version it was stored at.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChainRecord {
    pub version: u64,
    pub state: ChainState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// Stored, at the given version.
    Committed(u64),

    /// The record changed since it was read.
    Conflict,
}

/// Storage of chain states keyed by DID suffix.
///
/// Writes are compare-and-swap on the record version, so that two operations
/// racing for the same suffix cannot both be admitted.
pub trait ChainStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(&self, did_suffix: &DIDSuffix) -> Result<Option<ChainRecord>, Self::Error>;

    /// Store `state` if the current version is `expected_version` (`None` for
    /// a suffix with no record).
    fn compare_and_swap(
        &self,
        did_suffix: &DIDSuffix,
        expected_version: Option<u64>,
        state: ChainState,
    ) -> Result<CasOutcome, Self::Error>;
}

impl<T: ChainStore + ?Sized> ChainStore for &T {
    type Error = T::Error;

    fn get(&self, did_suffix: &DIDSuffix) -> Result<Option<ChainRecord>, Self::Error> {
        T::get(self, did_suffix)
    }

    fn compare_and_swap(
        &self,
        did_suffix: &DIDSuffix,
        expected_version: Option<u64>,
        state: ChainState,
    ) -> Result<CasOutcome, Self::Error> {
        T::compare_and_swap(self, did_suffix, expected_version, state)
    }
}

impl<T: ChainStore + ?Sized> ChainStore for Arc<T> {
    type Error = T::Error;

    fn get(&self, did_suffix: &DIDSuffix) -> Result<Option<ChainRecord>, Self::Error> {
        T::get(self, did_suffix)
    }

    fn compare_and_swap(
        &self,
        did_suffix: &DIDSuffix,
        expected_version: Option<u64>,
        state: ChainState,
    ) -> Result<CasOutcome, Self::Error> {
        T::compare_and_swap(self, did_suffix, expected_version, state)
    }
}

type Slot = Arc<Mutex<Option<ChainRecord>>>;

/// In-memory chain store.
///
/// Each suffix has its own slot and lock. The outer map is only locked to
/// find or insert a slot, so operations on different suffixes do not wait
/// for each other.
#[derive(Debug, Default)]
pub struct MemoryChainStore {
    slots: RwLock<HashMap<DIDSuffix, Slot>>,
}

impl MemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, did_suffix: &DIDSuffix) -> Slot {
        if let Some(slot) = self.slots.read().get(did_suffix) {
            return slot.clone();
        }
        self.slots
            .write()
            .entry(did_suffix.clone())
            .or_default()
            .clone()
    }

    /// Suffixes with a stored record.
    pub fn suffixes(&self) -> Vec<DIDSuffix> {
        self.slots
            .read()
            .iter()
            .filter(|(_, slot)| slot.lock().is_some())
            .map(|(suffix, _)| suffix.clone())
            .collect()
    }
}

impl ChainStore for MemoryChainStore {
    type Error = Infallible;

    fn get(&self, did_suffix: &DIDSuffix) -> Result<Option<ChainRecord>, Self::Error> {
        let slot = self.slots.read().get(did_suffix).cloned();
        Ok(slot.and_then(|slot| slot.lock().clone()))
    }

    fn compare_and_swap(
        &self,
        did_suffix: &DIDSuffix,
        expected_version: Option<u64>,
        state: ChainState,
    ) -> Result<CasOutcome, Self::Error> {
        // Only a first write may allocate a slot.
        let slot = match expected_version {
            None => self.slot(did_suffix),
            Some(_) => match self.slots.read().get(did_suffix) {
                Some(slot) => slot.clone(),
                None => return Ok(CasOutcome::Conflict),
            },
        };
        let mut record = slot.lock();
        if record.as_ref().map(|r| r.version) != expected_version {
            return Ok(CasOutcome::Conflict);
        }
        let version = expected_version.map_or(1, |v| v + 1);
        *record = Some(ChainRecord { version, state });
        Ok(CasOutcome::Committed(version))
    }
}
