//! Session TPO (market profile) aggregation
//!
//! Aggregates an auxiliary lower-timeframe bar series into per-session
//! Time-Price-Opportunity grids: one row per price increment, scored by how
//! many sub-bars touched it, lettered in chronological order from a cyclic
//! alphabet. Rows touched exactly once are single prints.
//!
//! Sessions are cached by their concrete start instant. The historical
//! backfill path is throttled and evicts sessions that fell outside the
//! loaded history window; the live path recomputes the one open session on
//! every update, unthrottled.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Days;
use serde::{Deserialize, Serialize};

use crate::config::TpoSettings;
use crate::domain::{SessionWindow, SubBar};
use crate::utils::maths_utils::{ceil_to_grid, floor_to_grid, get_max, get_min, round_to_grid};
use crate::utils::time_utils::{epoch_ms_to_naive, epoch_ms_to_string, naive_to_epoch_ms};

/// One symbol per sub-bar, wrapping when a session outlives the alphabet.
const TPO_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789@$€£{}[]()*+-/=%&?!";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TpoLevel {
    pub price_level: f64,
    /// Count of sub-bars touching this level
    pub score: u32,
    /// One symbol per touching sub-bar, in chronological order
    pub letters: String,
    pub is_single_print: bool,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProfile {
    pub session_start_ms: i64,
    pub session_end_ms: i64,
    /// Sorted descending by price for presentation
    pub tpo_levels: Vec<TpoLevel>,
    pub sub_bar_count: usize,
}

/// Flattened single-print row for the consumer read API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinglePrint {
    pub price_level: f64,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
}

struct CacheInner {
    sessions: HashMap<i64, SessionProfile>,
    last_backfill: Option<Instant>,
}

/// Aggregates sub-bars into session TPO profiles behind one mutex.
/// All reads copy out; no internal handle ever crosses the boundary.
pub struct SessionProfileEngine {
    windows: Vec<SessionWindow>,
    grid: f64,
    settings: TpoSettings,
    inner: Mutex<CacheInner>,
}

impl SessionProfileEngine {
    pub fn new(windows: Vec<SessionWindow>, tick_size: f64, settings: TpoSettings) -> Self {
        let grid = tick_size * settings.ticks_per_tpo as f64;
        Self {
            windows,
            grid,
            settings,
            inner: Mutex::new(CacheInner {
                sessions: HashMap::new(),
                last_backfill: None,
            }),
        }
    }

    /// Recompute all sessions overlapping the loaded sub-bar history.
    ///
    /// Throttled: re-entry within `min_recompute_interval_ms` is a no-op so a
    /// paint-storm cannot trigger pathological recomputation. Sessions whose
    /// date fell outside the loaded window are evicted here.
    pub fn backfill(&self, sub_bars: &[SubBar]) {
        let mut inner = self.inner.lock().unwrap();

        if let Some(last) = inner.last_backfill
            && last.elapsed() < Duration::from_millis(self.settings.min_recompute_interval_ms)
        {
            return;
        }
        inner.last_backfill = Some(Instant::now());

        if sub_bars.is_empty() {
            log::warn!("session backfill: no sub-bar data loaded, skipping cycle");
            return;
        }

        let left_ms = sub_bars.iter().map(|b| b.time_left_ms).min().unwrap_or(0);
        let right_ms = sub_bars.iter().map(|b| b.time_left_ms).max().unwrap_or(0);

        let (Some(left), Some(right)) = (epoch_ms_to_naive(left_ms), epoch_ms_to_naive(right_ms))
        else {
            log::error!(
                "session backfill: invalid history border times ({left_ms}, {right_ms})"
            );
            return;
        };

        let start_date = left.date();
        let end_date = right
            .date()
            .checked_add_days(Days::new(1))
            .unwrap_or(right.date());

        // Evict sessions that drifted outside the loaded window
        inner.sessions.retain(|start_ms, _| {
            epoch_ms_to_naive(*start_ms)
                .map(|dt| dt.date() >= start_date && dt.date() <= end_date)
                .unwrap_or(false)
        });

        for window in &self.windows {
            let mut current_date = start_date;
            while current_date <= end_date {
                let Some((start, end)) = window.materialize(current_date) else {
                    log::error!("session backfill: date arithmetic failed on {current_date}");
                    break;
                };
                let start_ms = naive_to_epoch_ms(start);
                let end_ms = naive_to_epoch_ms(end);

                let next_date = match current_date.checked_add_days(Days::new(1)) {
                    Some(d) => d,
                    None => break,
                };

                if start_ms > right_ms || end_ms < left_ms {
                    current_date = next_date;
                    continue;
                }

                // Clamp an open session to the right edge of loaded history
                let end_ms = end_ms.min(right_ms);

                if !inner.sessions.contains_key(&start_ms) {
                    let profile = self.compute_profile(start_ms, end_ms, sub_bars);
                    if profile.sub_bar_count > 0 {
                        log::info!(
                            "session added: {} to {} ({} sub-bars)",
                            epoch_ms_to_string(start_ms),
                            epoch_ms_to_string(end_ms),
                            profile.sub_bar_count
                        );
                        inner.sessions.insert(start_ms, profile);
                    }
                }

                current_date = next_date;
            }
        }
    }

    /// Recompute the session currently containing `now_ms`, unthrottled.
    /// There is at most one open session at a time.
    pub fn live_update(&self, now_ms: i64, sub_bars: &[SubBar]) {
        let Some(now) = epoch_ms_to_naive(now_ms) else {
            log::error!("session live update: invalid timestamp {now_ms}");
            return;
        };

        let mut inner = self.inner.lock().unwrap();

        for window in &self.windows {
            // A window wrapping past midnight may have opened yesterday
            let mut candidate_dates = vec![now.date()];
            if window.open > window.close
                && let Some(prev) = now.date().checked_sub_days(Days::new(1))
            {
                candidate_dates.push(prev);
            }

            for date in candidate_dates {
                let Some((start, end)) = window.materialize(date) else {
                    continue;
                };
                if now < start || now > end {
                    continue;
                }

                let start_ms = naive_to_epoch_ms(start);
                let end_ms = naive_to_epoch_ms(end);
                let profile = self.compute_profile(start_ms, end_ms, sub_bars);
                if profile.sub_bar_count > 0 {
                    inner.sessions.insert(start_ms, profile);
                }
                return;
            }
        }
    }

    /// Build one session's TPO grid from scratch. Pure with respect to the
    /// cache; scores and letters always start from zero.
    fn compute_profile(&self, start_ms: i64, end_ms: i64, sub_bars: &[SubBar]) -> SessionProfile {
        let empty = SessionProfile {
            session_start_ms: start_ms,
            session_end_ms: end_ms,
            tpo_levels: Vec::new(),
            sub_bar_count: 0,
        };

        if start_ms > end_ms {
            log::info!(
                "session {}: empty window after clamping, skipping",
                epoch_ms_to_string(start_ms)
            );
            return empty;
        }

        // Contiguous run of sub-bars whose left edge falls in the window,
        // located from the most recent end inclusive
        let mut min_index = None;
        let mut max_index = None;
        for (i, bar) in sub_bars.iter().enumerate().rev() {
            if bar.time_left_ms >= start_ms && bar.time_left_ms <= end_ms {
                max_index.get_or_insert(i);
                min_index = Some(i);
            }
        }
        let (Some(min_index), Some(max_index)) = (min_index, max_index) else {
            log::info!(
                "session {}: no sub-bars in window",
                epoch_ms_to_string(start_ms)
            );
            return empty;
        };

        let in_window = &sub_bars[min_index..=max_index];

        // Session extremes, skipping zero-valued OHLC from bad bars
        let highs: Vec<f64> = in_window
            .iter()
            .filter(|b| b.high != 0.0 && b.low != 0.0)
            .map(|b| b.high)
            .collect();
        let lows: Vec<f64> = in_window
            .iter()
            .filter(|b| b.high != 0.0 && b.low != 0.0)
            .map(|b| b.low)
            .collect();

        if highs.is_empty() {
            log::info!(
                "session {}: no valid price data",
                epoch_ms_to_string(start_ms)
            );
            return empty;
        }
        let sub_bar_count = highs.len();

        let mut high = get_max(&highs);
        let mut low = get_min(&lows);

        if self.settings.round_levels {
            high = ceil_to_grid(high, self.grid);
            low = floor_to_grid(low, self.grid);
        } else {
            high = round_to_grid(high, self.grid);
            low = round_to_grid(low, self.grid);
        }

        let low_idx = (low / self.grid).round() as i64;
        let high_idx = (high / self.grid).round() as i64;

        let mut levels: Vec<TpoLevel> = (low_idx..=high_idx)
            .map(|idx| TpoLevel {
                price_level: idx as f64 * self.grid,
                score: 0,
                letters: String::new(),
                is_single_print: false,
                start_time_ms: start_ms,
                end_time_ms: end_ms,
            })
            .collect();

        let alphabet: Vec<char> = TPO_ALPHABET.chars().collect();
        let mut letter_index = 0usize;

        // Oldest sub-bar first so letters read chronologically; the letter
        // counter advances once per sub-bar, not per touched level
        for bar in in_window.iter() {
            let span_low = (bar.low / self.grid).floor() as i64;
            let span_high = (bar.high / self.grid).ceil() as i64;
            let letter = alphabet[letter_index % alphabet.len()];

            for idx in span_low..=span_high {
                if idx < low_idx || idx > high_idx {
                    continue;
                }
                let level = &mut levels[(idx - low_idx) as usize];
                level.score += 1;
                level.letters.push(letter);
            }
            letter_index += 1;
        }

        for level in &mut levels {
            level.is_single_print = self.settings.highlight_single_prints && level.score == 1;
        }
        levels.sort_by(|a, b| b.price_level.total_cmp(&a.price_level));

        SessionProfile {
            session_start_ms: start_ms,
            session_end_ms: end_ms,
            tpo_levels: levels,
            sub_bar_count,
        }
    }

    // --- Consumer read API: copies only ---

    pub fn session_snapshot(&self) -> HashMap<i64, SessionProfile> {
        self.inner.lock().unwrap().sessions.clone()
    }

    pub fn session(&self, start_ms: i64) -> Option<SessionProfile> {
        self.inner.lock().unwrap().sessions.get(&start_ms).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    pub fn single_prints_by_session(&self) -> HashMap<i64, Vec<SinglePrint>> {
        let inner = self.inner.lock().unwrap();
        inner
            .sessions
            .iter()
            .map(|(start_ms, profile)| {
                let prints = profile
                    .tpo_levels
                    .iter()
                    .filter(|l| l.is_single_print)
                    .map(|l| SinglePrint {
                        price_level: l.price_level,
                        start_time_ms: l.start_time_ms,
                        end_time_ms: l.end_time_ms,
                    })
                    .collect();
                (*start_ms, prints)
            })
            .collect()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.clear();
        inner.last_backfill = None;
    }
}
