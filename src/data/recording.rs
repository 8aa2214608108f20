//! Recorded bar data for the replay binary.
//!
//! A recording is a plain JSON capture of what the host feed would deliver
//! live: primary bars with their footprints, the auxiliary lower-timeframe
//! series, and the session templates. Friendly enough to author by hand for
//! small scenarios.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, PriceLevel, SessionWindow, SubBar, VolumeProfile};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RecordedLevel {
    pub price: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RecordedBar {
    pub time_ms: i64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub median: f64,
    /// Empty means the host never produced volume analysis for this bar
    #[serde(default)]
    pub levels: Vec<RecordedLevel>,
}

/// Session template as local times of day, `"HH:MM"`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RecordedSessionWindow {
    pub open: String,
    pub close: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Recording {
    pub tick_size: f64,
    pub bars: Vec<RecordedBar>,
    #[serde(default)]
    pub sub_bars: Vec<SubBar>,
    #[serde(default)]
    pub session_windows: Vec<RecordedSessionWindow>,
}

impl Recording {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).context(format!("Failed to open recording: {:?}", path))?;
        let reader = BufReader::new(file);
        let recording: Recording = serde_json::from_reader(reader)
            .context(format!("Failed to parse recording: {:?}", path))?;

        if recording.tick_size <= 0.0 {
            bail!("Recording {:?} has non-positive tick size", path);
        }
        Ok(recording)
    }

    /// Materialize host-shaped bars, offsets assigned by position.
    pub fn to_bars(&self) -> Vec<Bar> {
        self.bars
            .iter()
            .enumerate()
            .map(|(index, rec)| {
                let volume_profile = if rec.levels.is_empty() {
                    None
                } else {
                    let mut profile = VolumeProfile::new();
                    for l in &rec.levels {
                        profile.insert_level(PriceLevel::new(l.price, l.buy_volume, l.sell_volume));
                    }
                    Some(profile)
                };

                Bar {
                    index,
                    time_ms: rec.time_ms,
                    high: rec.high,
                    low: rec.low,
                    close: rec.close,
                    median: rec.median,
                    volume_profile,
                }
            })
            .collect()
    }

    pub fn parse_session_windows(&self) -> Result<Vec<SessionWindow>> {
        self.session_windows
            .iter()
            .map(|w| {
                let open = NaiveTime::parse_from_str(&w.open, "%H:%M")
                    .context(format!("Bad session open time '{}'", w.open))?;
                let close = NaiveTime::parse_from_str(&w.close, "%H:%M")
                    .context(format!("Bad session close time '{}'", w.close))?;
                Ok(SessionWindow::new(open, close))
            })
            .collect()
    }
}
