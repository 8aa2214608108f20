//! Detection and computation configuration
//!
//! All thresholds are plain numeric/boolean knobs. The host persists and
//! restores them through its own settings mechanism; this const block only
//! supplies the defaults.

use serde::{Deserialize, Serialize};

/// Settings for the absorption detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbsorptionSettings {
    // Fraction of ATR defining the max allowed price spread of a qualifying cluster
    pub sensitivity: f64,
    // Multiple of average level volume a level must exceed to count as high-volume
    pub volume_threshold_multiple: f64,
    // Minimum max(buy,sell)/min(buy,sell) at the dominant level
    pub imbalance_ratio: f64,
    // Max number of top levels considered for one cluster
    pub cluster_size: usize,
    // EMA true-range smoothing period
    pub atr_period: usize,
}

/// Settings for the imbalance scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImbalanceSettings {
    // Minimum diagonal volume ratio for a level to qualify
    pub ratio_threshold: f64,
    // A run shorter than this is treated as single-tick noise
    pub min_consecutive_levels: usize,
}

/// Settings for the trapped-traders detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrappedSettings {
    pub min_levels_trapped: usize,
    // Cumulative one-side vs other-side ratio required to extend a cluster
    pub imbalance_ratio: f64,
    // Rejection gate: close must sit more than (true range * this) ticks off the extreme
    pub true_range_multiplier: f64,
    // Per-level volume floor: max(avg * this, total * fraction below)
    pub volume_floor_avg_multiple: f64,
    pub volume_floor_total_fraction: f64,
}

/// Settings for the session TPO profile engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TpoSettings {
    // Price increments per TPO grid row
    pub ticks_per_tpo: u32,
    // true: ceil the session high / floor the low onto the grid; false: nearest
    pub round_levels: bool,
    pub highlight_single_prints: bool,
    // Minimum wall-clock gap between historical recomputes
    pub min_recompute_interval_ms: u64,
}

/// The Master Detection Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub absorption: AbsorptionSettings,
    pub imbalance: ImbalanceSettings,
    pub trapped: TrappedSettings,
    pub tpo: TpoSettings,
}

pub const DETECTION: DetectionConfig = DetectionConfig {
    absorption: AbsorptionSettings {
        sensitivity: 0.3,
        volume_threshold_multiple: 5.0,
        imbalance_ratio: 3.0,
        cluster_size: 10,
        atr_period: 14,
    },

    imbalance: ImbalanceSettings {
        ratio_threshold: 4.0,
        min_consecutive_levels: 2,
    },

    trapped: TrappedSettings {
        min_levels_trapped: 5,
        imbalance_ratio: 4.0,
        true_range_multiplier: 0.1,
        volume_floor_avg_multiple: 1.5,
        volume_floor_total_fraction: 0.005,
    },

    tpo: TpoSettings {
        ticks_per_tpo: 10,
        round_levels: true,
        highlight_single_prints: true,
        min_recompute_interval_ms: 500,
    },
};
