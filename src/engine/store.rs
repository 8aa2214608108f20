//! Mutex-guarded result stores
//!
//! Each detector writes into its own store; render/consumer code may run
//! concurrently with the background backfill or a live update, so every read
//! hands out a copy, never a live handle. Critical sections stay short:
//! mutation happens fully inside the lock.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::analysis::absorption::AbsorptionZone;
use crate::analysis::imbalance::{BarImbalances, ImbalanceZone};

/// Append-only sequence of absorption zones, at most one per bar index,
/// accumulated for the lifetime of the indicator.
#[derive(Default)]
pub struct AbsorptionStore {
    zones: Mutex<Vec<AbsorptionZone>>,
}

impl AbsorptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a zone unless this bar already has one. Zones are never
    /// revised retroactively, so a second detection for the same bar (e.g.
    /// another tick of the same live bar) is dropped.
    pub fn append(&self, zone: AbsorptionZone) -> bool {
        let mut zones = self.zones.lock().unwrap();
        if zones.iter().rev().any(|z| z.bar_index == zone.bar_index) {
            return false;
        }
        zones.push(zone);
        true
    }

    pub fn contains_bar(&self, bar_index: usize) -> bool {
        self.zones
            .lock()
            .unwrap()
            .iter()
            .rev()
            .any(|z| z.bar_index == bar_index)
    }

    pub fn snapshot(&self) -> Vec<AbsorptionZone> {
        self.zones.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.zones.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.zones.lock().unwrap().clear();
    }
}

/// Imbalance results keyed by bar offset.
///
/// Sparse by design: an absent key means "not yet computed" while a present
/// `BarImbalances` with empty vectors means "computed, nothing found".
/// Consumers must treat absent slots as legitimately still pending, whether
/// the backfill has not reached them or the bar has no profile yet.
#[derive(Default)]
pub struct ImbalanceStore {
    slots: Mutex<HashMap<usize, BarImbalances>>,
}

impl ImbalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot for `offset` with a fresh scan result.
    pub fn commit(&self, offset: usize, buys: Vec<ImbalanceZone>, sells: Vec<ImbalanceZone>) {
        let mut slots = self.slots.lock().unwrap();
        slots.insert(offset, BarImbalances { buys, sells });
    }

    /// `None` = not yet computed; `Some` with empty vectors = computed clean.
    pub fn for_bar(&self, offset: usize) -> Option<BarImbalances> {
        self.slots.lock().unwrap().get(&offset).cloned()
    }

    pub fn snapshot(&self) -> HashMap<usize, BarImbalances> {
        self.slots.lock().unwrap().clone()
    }

    pub fn computed_count(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.slots.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(bar_index: usize) -> AbsorptionZone {
        AbsorptionZone {
            bar_index,
            price: 100.0,
            strength: 0.5,
            is_bullish: true,
            time_ms: 0,
        }
    }

    #[test]
    fn test_absorption_appends_once_per_bar() {
        let store = AbsorptionStore::new();
        assert!(store.append(zone(7)));
        assert!(!store.append(zone(7)), "same bar must not append twice");
        assert!(store.append(zone(8)));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_imbalance_absent_vs_empty() {
        let store = ImbalanceStore::new();
        assert!(store.for_bar(3).is_none(), "never computed => absent");

        store.commit(3, Vec::new(), Vec::new());
        let slot = store.for_bar(3).expect("computed => present");
        assert!(slot.is_empty(), "computed with no findings => empty");
    }

    #[test]
    fn test_imbalance_commit_overwrites() {
        let store = ImbalanceStore::new();
        store.commit(
            0,
            vec![ImbalanceZone {
                start_price: 100.0,
                end_price: 101.0,
                ratios: vec![5.0],
            }],
            Vec::new(),
        );
        store.commit(0, Vec::new(), Vec::new());
        assert!(store.for_bar(0).unwrap().is_empty());
        assert_eq!(store.computed_count(), 1);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = ImbalanceStore::new();
        store.commit(1, Vec::new(), Vec::new());
        let mut snap = store.snapshot();
        snap.remove(&1);
        assert!(store.for_bar(1).is_some(), "mutating a snapshot must not touch the store");
    }
}
