//! Trapped-trader cluster detection
//!
//! Aggressive flow concentrated at one end of a bar that failed to move
//! price: sellers stacked at the lows (or buyers at the highs) whose
//! positions are underwater once the bar closes back through the cluster.
//! Detection alone is not a signal; the true-range rejection check in
//! `confirm` is part of the contract because a cluster without rejection is
//! meaningless.

use statrs::statistics::Statistics;

use crate::config::TrappedSettings;
use crate::domain::{Bar, PriceLevel};

/// Transient result of one detection call; recomputed per update from the
/// bar's own profile, never persisted.
#[derive(Debug, Clone, Copy)]
pub struct TrappedCluster {
    pub trapped_sellers: bool,
    pub seller_cluster_high: f64,
    pub trapped_buyers: bool,
    pub buyer_cluster_low: f64,
}

impl Default for TrappedCluster {
    fn default() -> Self {
        Self {
            trapped_sellers: false,
            seller_cluster_high: f64::NAN,
            trapped_buyers: false,
            buyer_cluster_low: f64::NAN,
        }
    }
}

/// Outcome of gating a cluster against the bar's own price action.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrappedConfirmation {
    pub sellers_confirmed: bool,
    pub buyers_confirmed: bool,
}

/// Find consecutive trapped-seller/buyer clusters in one bar's sorted levels.
///
/// Two cumulative scans: from the low end upward for sellers, from the high
/// end downward for buyers. A cluster extends while the running one-sided
/// total dominates the other side by `imbalance_ratio` AND the level's own
/// volume clears the floor `max(avg * floor_multiple, total * floor_fraction)`;
/// it stops at the first level failing either condition.
pub fn detect(sorted_levels: &[PriceLevel], settings: &TrappedSettings) -> TrappedCluster {
    let mut result = TrappedCluster::default();

    let levels_count = sorted_levels.len();
    if levels_count < settings.min_levels_trapped {
        return result;
    }

    let avg_volume = sorted_levels.iter().map(|l| l.total_volume).mean();
    let total_volume: f64 = sorted_levels.iter().map(|l| l.total_volume).sum();
    let volume_floor = (settings.volume_floor_avg_multiple * avg_volume)
        .max(settings.volume_floor_total_fraction * total_volume);

    // Sellers: scan up from the low
    let mut running_bid = 0.0;
    let mut running_ask = 0.0;
    let mut seller_cluster_size = 0;

    for (i, level) in sorted_levels.iter().enumerate() {
        running_bid += level.sell_volume;
        running_ask += level.buy_volume;

        if running_bid >= settings.imbalance_ratio * running_ask && level.sell_volume >= volume_floor
        {
            seller_cluster_size = i + 1;
        } else {
            break;
        }
    }

    if seller_cluster_size >= settings.min_levels_trapped {
        result.trapped_sellers = true;
        result.seller_cluster_high = sorted_levels[seller_cluster_size - 1].price;
    }

    // Buyers: scan down from the high, bid/ask roles swapped
    let mut running_bid = 0.0;
    let mut running_ask = 0.0;
    let mut buyer_cluster_size = 0;

    for (i, level) in sorted_levels.iter().rev().enumerate() {
        running_bid += level.sell_volume;
        running_ask += level.buy_volume;

        if running_ask >= settings.imbalance_ratio * running_bid && level.buy_volume >= volume_floor
        {
            buyer_cluster_size = i + 1;
        } else {
            break;
        }
    }

    if buyer_cluster_size >= settings.min_levels_trapped {
        result.trapped_buyers = true;
        result.buyer_cluster_low = sorted_levels[levels_count - buyer_cluster_size].price;
    }

    result
}

/// Gate a detected cluster against the bar's true range.
///
/// Trapped sellers are actionable only when the bar closed off its low hard
/// enough: median below close, the close-to-low distance (in ticks) clearing
/// `true_range * multiplier`, and the close back above the whole cluster.
/// Buyers symmetric on the high side.
pub fn confirm(
    cluster: &TrappedCluster,
    bar: &Bar,
    tick_size: f64,
    settings: &TrappedSettings,
) -> TrappedConfirmation {
    let mut confirmation = TrappedConfirmation::default();
    if tick_size <= 0.0 {
        return confirmation;
    }

    let true_range_ticks = bar.true_range_ticks(tick_size);
    let rejection_floor = true_range_ticks * settings.true_range_multiplier;

    if cluster.trapped_sellers && bar.median < bar.close {
        let rejection_from_low = (bar.close - bar.low) / tick_size;
        confirmation.sellers_confirmed =
            rejection_from_low > rejection_floor && bar.close > cluster.seller_cluster_high;
    }

    if cluster.trapped_buyers && bar.median > bar.close {
        let rejection_from_high = (bar.high - bar.close) / tick_size;
        confirmation.buyers_confirmed =
            rejection_from_high > rejection_floor && bar.close < cluster.buyer_cluster_low;
    }

    confirmation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DETECTION;

    fn level(price: f64, buy: f64, sell: f64) -> PriceLevel {
        PriceLevel::new(price, buy, sell)
    }

    fn settings() -> TrappedSettings {
        TrappedSettings {
            min_levels_trapped: 3,
            ..DETECTION.trapped.clone()
        }
    }

    /// Four lower levels dominated by aggressive sells, a quiet top half
    fn seller_heavy_levels() -> Vec<PriceLevel> {
        vec![
            level(100.0, 2.0, 100.0),
            level(100.5, 2.0, 110.0),
            level(101.0, 2.0, 105.0),
            level(101.5, 2.0, 95.0),
            level(102.0, 5.0, 2.0),
            level(102.5, 4.0, 1.0),
            level(103.0, 3.0, 1.0),
            level(103.5, 2.0, 1.0),
        ]
    }

    #[test]
    fn test_trapped_sellers_detected_at_low_end() {
        let cluster = detect(&seller_heavy_levels(), &settings());
        assert!(cluster.trapped_sellers);
        assert!(!cluster.trapped_buyers);
        // Cluster stops at 101.5: 102.0's own sell volume misses the floor
        assert_eq!(cluster.seller_cluster_high, 101.5);
    }

    #[test]
    fn test_trapped_buyers_detected_at_high_end() {
        // Mirror of the seller fixture: aggressive buys stacked at the top
        let levels = vec![
            level(100.0, 1.0, 2.0),
            level(100.5, 1.0, 3.0),
            level(101.0, 1.0, 4.0),
            level(101.5, 2.0, 5.0),
            level(102.0, 95.0, 2.0),
            level(102.5, 105.0, 2.0),
            level(103.0, 110.0, 2.0),
            level(103.5, 100.0, 2.0),
        ];
        let cluster = detect(&levels, &settings());
        assert!(cluster.trapped_buyers);
        assert!(!cluster.trapped_sellers);
        assert_eq!(cluster.buyer_cluster_low, 102.0);
    }

    #[test]
    fn test_too_few_levels_is_no_cluster() {
        let levels = vec![level(100.0, 0.0, 50.0), level(100.5, 0.0, 50.0)];
        let cluster = detect(&levels, &settings());
        assert!(!cluster.trapped_sellers);
        assert!(!cluster.trapped_buyers);
    }

    #[test]
    fn test_raising_ratio_only_shrinks_cluster() {
        let levels = seller_heavy_levels();
        let mut previous_size = usize::MAX;

        for ratio in [1.0, 2.0, 4.0, 8.0, 16.0, 64.0] {
            let s = TrappedSettings {
                imbalance_ratio: ratio,
                min_levels_trapped: 1,
                ..settings()
            };
            let cluster = detect(&levels, &s);
            let size = if cluster.trapped_sellers {
                levels
                    .iter()
                    .position(|l| l.price == cluster.seller_cluster_high)
                    .unwrap()
                    + 1
            } else {
                0
            };
            assert!(
                size <= previous_size,
                "cluster grew from {} to {} when ratio rose to {}",
                previous_size,
                size,
                ratio
            );
            previous_size = size;
        }
    }

    #[test]
    fn test_confirmation_requires_rejection_past_cluster() {
        let cluster = TrappedCluster {
            trapped_sellers: true,
            seller_cluster_high: 101.5,
            trapped_buyers: false,
            buyer_cluster_low: f64::NAN,
        };

        // Closed at 103 off a 100 low: rejection of 30 ticks against a
        // floor of (high-low)/tick * 0.1 = 4 ticks, close above the cluster
        let bar = Bar {
            index: 0,
            time_ms: 0,
            high: 104.0,
            low: 100.0,
            close: 103.0,
            median: 102.0,
            volume_profile: None,
        };
        let confirmed = confirm(&cluster, &bar, 0.1, &settings());
        assert!(confirmed.sellers_confirmed);

        // Same bar but close buried inside the cluster: not confirmed
        let weak_bar = Bar { close: 101.0, median: 100.5, ..bar.clone() };
        let confirmed = confirm(&cluster, &weak_bar, 0.1, &settings());
        assert!(!confirmed.sellers_confirmed);

        // Median above close means no seller rejection shape at all
        let wrong_shape = Bar { median: 103.5, ..bar };
        let confirmed = confirm(&cluster, &wrong_shape, 0.1, &settings());
        assert!(!confirmed.sellers_confirmed);
    }
}
