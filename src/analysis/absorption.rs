//! Absorption detection
//!
//! Absorption is large passive volume concentrated in a narrow price cluster
//! that stalls price despite aggressive one-sided flow. Per bar the detector
//! either finds the single strongest qualifying cluster or nothing.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::config::AbsorptionSettings;
use crate::domain::PriceLevel;

/// A confirmed absorption event within one bar. The caller owns bar identity
/// and timestamps; the detector only knows price levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbsorptionHit {
    /// Mean price of the qualifying cluster
    pub price: f64,
    /// Normalized to [0, 1]
    pub strength: f64,
    pub is_bullish: bool,
}

/// The persisted form: one zone per qualifying bar, appended once and never
/// revised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbsorptionZone {
    pub bar_index: usize,
    pub price: f64,
    pub strength: f64,
    pub is_bullish: bool,
    pub time_ms: i64,
}

/// Detect the strongest absorption cluster in one bar's sorted levels.
///
/// `atr_value` scales the maximum allowed price spread of the cluster:
/// levels further apart than `atr * sensitivity` cannot be one absorption
/// event.
pub fn detect(
    sorted_levels: &[PriceLevel],
    atr_value: f64,
    settings: &AbsorptionSettings,
) -> Option<AbsorptionHit> {
    if sorted_levels.is_empty() {
        return None;
    }

    let avg_volume = sorted_levels.iter().map(|l| l.total_volume).mean();
    let volume_floor = avg_volume * settings.volume_threshold_multiple;
    let max_allowed_range = atr_value * settings.sensitivity;

    // Top `cluster_size` high-volume levels, busiest first
    let cluster: Vec<&PriceLevel> = sorted_levels
        .iter()
        .filter(|l| l.total_volume >= volume_floor)
        .sorted_by(|a, b| b.total_volume.total_cmp(&a.total_volume))
        .take(settings.cluster_size)
        .collect();

    if cluster.is_empty() {
        return None;
    }

    // Cluster too spread out to be one absorption event
    let (min_price, max_price) = cluster
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), l| {
            (lo.min(l.price), hi.max(l.price))
        });
    if max_price - min_price > max_allowed_range {
        return None;
    }

    let mut total_volume = 0.0;
    let mut total_delta = 0.0;
    let mut max_imbalance: f64 = 0.0;

    for level in &cluster {
        let dominant = level.buy_volume.max(level.sell_volume);
        let weaker = level.buy_volume.min(level.sell_volume);
        // A one-sided level is an effectively infinite imbalance
        let imbalance = if weaker > 0.0 {
            dominant / weaker
        } else {
            f64::INFINITY
        };
        max_imbalance = max_imbalance.max(imbalance);

        total_volume += level.total_volume;
        total_delta += level.delta();
    }

    if max_imbalance < settings.imbalance_ratio || total_volume < volume_floor {
        return None;
    }

    let price = cluster.iter().map(|l| l.price).sum::<f64>() / cluster.len() as f64;
    let strength =
        ((total_volume / volume_floor) * (max_imbalance / settings.imbalance_ratio)).min(1.0);

    Some(AbsorptionHit {
        price,
        strength,
        is_bullish: total_delta > 0.0,
    })
}
