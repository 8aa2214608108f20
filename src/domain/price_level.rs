use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// One traded price increment within a bar.
///
/// `buy_volume` is aggressive buys (trades hitting the ask), `sell_volume`
/// aggressive sells. Downstream ratios assume both are >= 0.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub total_volume: f64,
}

impl PriceLevel {
    pub fn new(price: f64, buy_volume: f64, sell_volume: f64) -> Self {
        Self {
            price,
            buy_volume,
            sell_volume,
            total_volume: buy_volume + sell_volume,
        }
    }

    pub fn delta(&self) -> f64 {
        self.buy_volume - self.sell_volume
    }
}

/// Per-bar footprint: an unordered mapping from price to its traded volumes.
///
/// Keyed by the price's bit pattern so exact f64 prices can live in a HashMap.
/// Detectors never mutate a bar's profile; they work on `sorted_levels()`
/// snapshots recomputed on demand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeProfile {
    levels: HashMap<u64, PriceLevel>,
}

impl VolumeProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accrete one trade into the level at `price`.
    pub fn add_trade(&mut self, price: f64, qty: f64, is_sell: bool) {
        let entry = self.levels.entry(price.to_bits()).or_insert(PriceLevel {
            price,
            buy_volume: 0.0,
            sell_volume: 0.0,
            total_volume: 0.0,
        });
        if is_sell {
            entry.sell_volume += qty;
        } else {
            entry.buy_volume += qty;
        }
        entry.total_volume += qty;
    }

    /// Insert or replace a whole level (used when loading recorded data).
    pub fn insert_level(&mut self, level: PriceLevel) {
        self.levels.insert(level.price.to_bits(), level);
    }

    pub fn get(&self, price: f64) -> Option<&PriceLevel> {
        self.levels.get(&price.to_bits())
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Levels sorted ascending by price. Copies out; the profile itself stays
    /// untouched so a render pass can hold the bar while detectors run.
    pub fn sorted_levels(&self) -> Vec<PriceLevel> {
        self.levels
            .values()
            .copied()
            .sorted_by(|a, b| a.price.total_cmp(&b.price))
            .collect()
    }
}
