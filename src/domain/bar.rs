use serde::{Deserialize, Serialize};

use crate::domain::price_level::VolumeProfile;

/// A host-supplied chart bar. `index` is the offset from the start of
/// history; `volume_profile` stays `None` until the host has finished volume
/// analysis for this bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub index: usize,
    pub time_ms: i64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub median: f64,
    pub volume_profile: Option<VolumeProfile>,
}

impl Bar {
    pub fn has_profile(&self) -> bool {
        self.volume_profile
            .as_ref()
            .is_some_and(|p| !p.is_empty())
    }

    /// True range of the bar measured in ticks.
    pub fn true_range_ticks(&self, tick_size: f64) -> f64 {
        (self.high - self.low) / tick_size
    }
}

/// One bar of the auxiliary lower-timeframe series consumed by the session
/// profile engine. Only the left-edge time and the extremes matter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubBar {
    pub time_left_ms: i64,
    pub high: f64,
    pub low: f64,
}
