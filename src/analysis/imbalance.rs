//! Diagonal order-flow imbalance scanning
//!
//! An imbalance is a directional signature between adjacent price increments,
//! not a property of a single level: a buy imbalance compares a level's
//! aggressive buys against the sells one increment below, a sell imbalance
//! compares a level's aggressive sells against the buys one increment above.
//! Requiring a minimum run of consecutive qualifying levels filters out
//! single-tick anomalies.

use serde::{Deserialize, Serialize};

use crate::domain::PriceLevel;

/// Divisor floor for levels with no opposite-side volume
const EPSILON: f64 = 1e-6;

/// One consecutive run of qualifying levels, spanning
/// `[start_price, end_price]` with the ratio observed at each level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImbalanceZone {
    pub start_price: f64,
    pub end_price: f64,
    pub ratios: Vec<f64>,
}

/// Per-bar scan output: every buy and sell imbalance found in one profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarImbalances {
    pub buys: Vec<ImbalanceZone>,
    pub sells: Vec<ImbalanceZone>,
}

impl BarImbalances {
    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty()
    }
}

/// Scan one bar's ascending-sorted levels for buy and sell imbalance runs.
///
/// Both passes close a run at the first non-qualifying level and also capture
/// a run still open when the levels end. Runs shorter than
/// `min_consecutive_levels` are dropped.
pub fn scan(
    sorted_levels: &[PriceLevel],
    ratio_threshold: f64,
    min_consecutive_levels: usize,
) -> (Vec<ImbalanceZone>, Vec<ImbalanceZone>) {
    let n = sorted_levels.len();
    let mut buys: Vec<ImbalanceZone> = Vec::new();
    let mut sells: Vec<ImbalanceZone> = Vec::new();

    // ========================
    // Buy pass (bullish): this level's buys vs the sells one level below
    // ========================
    let mut run_start: Option<usize> = None;
    let mut ratios: Vec<f64> = Vec::new();

    for i in 1..n {
        let buy_volume = sorted_levels[i].buy_volume;
        let sell_below = sorted_levels[i - 1].sell_volume;
        let divisor = if sell_below > 0.0 { sell_below } else { EPSILON };
        let ratio = buy_volume / divisor;

        if ratio >= ratio_threshold {
            run_start.get_or_insert(i);
            ratios.push(ratio);
        } else {
            if let Some(start) = run_start
                && (i - start) >= min_consecutive_levels
            {
                buys.push(ImbalanceZone {
                    start_price: sorted_levels[start].price,
                    end_price: sorted_levels[i - 1].price,
                    ratios: std::mem::take(&mut ratios),
                });
            }
            run_start = None;
            ratios.clear();
        }
    }

    // Capture a run still open at the top of the profile
    if let Some(start) = run_start
        && (n - start) >= min_consecutive_levels
    {
        buys.push(ImbalanceZone {
            start_price: sorted_levels[start].price,
            end_price: sorted_levels[n - 1].price,
            ratios,
        });
    }

    // ========================
    // Sell pass (bearish): this level's sells vs the buys one level above
    // ========================
    let mut run_start: Option<usize> = None;
    let mut ratios: Vec<f64> = Vec::new();

    for i in 0..n.saturating_sub(1) {
        let sell_volume = sorted_levels[i].sell_volume;
        let buy_above = sorted_levels[i + 1].buy_volume;
        let divisor = if buy_above > 0.0 { buy_above } else { EPSILON };
        let ratio = sell_volume / divisor;

        if ratio >= ratio_threshold {
            run_start.get_or_insert(i);
            ratios.push(ratio);
        } else {
            if let Some(start) = run_start
                && (i - start) >= min_consecutive_levels
            {
                sells.push(ImbalanceZone {
                    start_price: sorted_levels[start].price,
                    end_price: sorted_levels[i - 1].price,
                    ratios: std::mem::take(&mut ratios),
                });
            }
            run_start = None;
            ratios.clear();
        }
    }

    // Capture a run still open at the second-to-last level
    if let Some(start) = run_start
        && (n - 1 - start) >= min_consecutive_levels
    {
        sells.push(ImbalanceZone {
            start_price: sorted_levels[start].price,
            end_price: sorted_levels[n - 2].price,
            ratios,
        });
    }

    (buys, sells)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(price: f64, buy: f64, sell: f64) -> PriceLevel {
        PriceLevel::new(price, buy, sell)
    }

    /// Mirror a level stack: reverse price order and swap buy/sell roles.
    fn mirrored(levels: &[PriceLevel]) -> Vec<PriceLevel> {
        let n = levels.len();
        (0..n)
            .map(|i| {
                let src = &levels[n - 1 - i];
                level(levels[i].price, src.sell_volume, src.buy_volume)
            })
            .collect()
    }

    #[test]
    fn test_single_level_ratio_scenario() {
        // Five ascending levels; level 101 buys 20 against 5 sells below:
        // ratio 4 >= threshold 3, min run 1 => one zone {101, 101, [4]}
        let levels = vec![
            level(100.0, 0.0, 5.0),
            level(101.0, 20.0, 0.0),
            level(102.0, 0.0, 0.0),
            level(103.0, 0.0, 0.0),
            level(104.0, 0.0, 0.0),
        ];
        let (buys, _sells) = scan(&levels, 3.0, 1);
        assert_eq!(buys.len(), 1);
        assert_eq!(buys[0].start_price, 101.0);
        assert_eq!(buys[0].end_price, 101.0);
        assert_eq!(buys[0].ratios, vec![4.0]);
    }

    #[test]
    fn test_minimum_run_enforcement() {
        // Two consecutive qualifying levels (101, 102). With min 3 no zone,
        // with min 2 exactly one zone spanning the run.
        let levels = vec![
            level(100.0, 0.0, 1.0),
            level(101.0, 10.0, 1.0),
            level(102.0, 10.0, 1.0),
            level(103.0, 0.0, 100.0),
        ];
        let (buys, _) = scan(&levels, 4.0, 3);
        assert!(buys.is_empty(), "run of 2 must not satisfy min 3");

        let (buys, _) = scan(&levels, 4.0, 2);
        assert_eq!(buys.len(), 1, "run of exactly 2 must produce one zone");
        assert_eq!(buys[0].start_price, 101.0);
        assert_eq!(buys[0].end_price, 102.0);
        assert_eq!(buys[0].ratios.len(), 2);
    }

    #[test]
    fn test_open_run_at_top_is_captured() {
        let levels = vec![
            level(100.0, 0.0, 1.0),
            level(101.0, 10.0, 1.0),
            level(102.0, 10.0, 1.0),
        ];
        let (buys, _) = scan(&levels, 4.0, 2);
        assert_eq!(buys.len(), 1);
        assert_eq!(buys[0].end_price, 102.0, "run reaching the last level still closes");
    }

    #[test]
    fn test_zero_divisor_uses_epsilon() {
        // Sells below are zero: any positive buy volume is a huge ratio
        let levels = vec![level(100.0, 0.0, 0.0), level(101.0, 1.0, 0.0)];
        let (buys, _) = scan(&levels, 100.0, 1);
        assert_eq!(buys.len(), 1);
        assert!(buys[0].ratios[0] > 1e5);
    }

    #[test]
    fn test_buy_sell_symmetry() {
        let levels = vec![
            level(100.0, 2.0, 5.0),
            level(101.0, 20.0, 1.0),
            level(102.0, 8.0, 2.0),
            level(103.0, 1.0, 30.0),
            level(104.0, 3.0, 0.5),
        ];
        let (buys, sells) = scan(&levels, 3.0, 1);

        let (m_buys, m_sells) = scan(&mirrored(&levels), 3.0, 1);

        // Swapping roles and reversing price order must swap the outputs.
        // Prices mirror around the ends of the grid; ratio runs reverse.
        assert_eq!(buys.len(), m_sells.len());
        assert_eq!(sells.len(), m_buys.len());

        let n = levels.len();
        let mirror_price = |p: f64| levels[0].price + levels[n - 1].price - p;

        for (zone, m_zone) in buys.iter().zip(m_sells.iter().rev()) {
            assert_eq!(m_zone.start_price, mirror_price(zone.end_price));
            assert_eq!(m_zone.end_price, mirror_price(zone.start_price));
            let mut reversed = zone.ratios.clone();
            reversed.reverse();
            assert_eq!(m_zone.ratios, reversed);
        }
        for (zone, m_zone) in sells.iter().zip(m_buys.iter().rev()) {
            assert_eq!(m_zone.start_price, mirror_price(zone.end_price));
            assert_eq!(m_zone.end_price, mirror_price(zone.start_price));
            let mut reversed = zone.ratios.clone();
            reversed.reverse();
            assert_eq!(m_zone.ratios, reversed);
        }
    }

    #[test]
    fn test_empty_and_single_level_profiles() {
        assert_eq!(scan(&[], 3.0, 1), (vec![], vec![]));
        let one = vec![level(100.0, 50.0, 50.0)];
        // One level has no adjacent level to compare against
        assert_eq!(scan(&one, 3.0, 1), (vec![], vec![]));
    }
}
