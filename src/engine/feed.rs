//! The host bar-feed boundary
//!
//! The host platform owns history and live updates; the engine only ever
//! asks it for bars by offset and for the materialization progress counters
//! the backfill uses to know when history is complete.

use std::sync::Mutex;

use crate::domain::Bar;

/// Read-only view of the host's bar history.
///
/// `bar_count` is how many bars the host has materialized so far;
/// `total_bar_count` is the full historical length. The two converge once
/// loading finishes, and the host fires the engine's readiness signal at
/// that point. The host may populate the buffer incrementally and out of
/// order before then; `bar()` simply returns `None` for anything missing.
pub trait BarFeed: Send + Sync + 'static {
    fn bar(&self, offset: usize) -> Option<Bar>;
    fn bar_count(&self) -> usize;
    fn total_bar_count(&self) -> usize;
    fn tick_size(&self) -> f64;
}

/// In-memory feed backing the replay binary and tests. Bars are pushed in
/// the order the recording delivered them, mimicking the host's incremental
/// population of history.
pub struct RecordedFeed {
    bars: Mutex<Vec<Bar>>,
    total: usize,
    tick_size: f64,
}

impl RecordedFeed {
    pub fn new(tick_size: f64, total: usize) -> Self {
        Self {
            bars: Mutex::new(Vec::new()),
            total,
            tick_size,
        }
    }

    pub fn push_bar(&self, bar: Bar) {
        self.bars.lock().unwrap().push(bar);
    }
}

impl BarFeed for RecordedFeed {
    fn bar(&self, offset: usize) -> Option<Bar> {
        self.bars.lock().unwrap().get(offset).cloned()
    }

    fn bar_count(&self) -> usize {
        self.bars.lock().unwrap().len()
    }

    fn total_bar_count(&self) -> usize {
        self.total
    }

    fn tick_size(&self) -> f64 {
        self.tick_size
    }
}
