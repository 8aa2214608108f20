//! The coordinator owning detectors and their stores.
//!
//! The host constructs one `FootprintEngine` per indicator instance and
//! hands it (behind `Arc`) to whatever consumer needs to read results —
//! explicit dependency injection instead of a process-wide "active
//! instance". The host drives `on_bar_update` from its single-threaded
//! event callback; the engine spawns exactly one background task, the
//! historical imbalance backfill.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::analysis::absorption::{self, AbsorptionZone};
use crate::analysis::imbalance::{self, BarImbalances};
use crate::analysis::session_profile::{SessionProfile, SessionProfileEngine, SinglePrint};
use crate::analysis::trapped::{self, TrappedCluster, TrappedConfirmation};
use crate::analysis::atr;
use crate::config::DetectionConfig;
use crate::domain::{SessionWindow, SubBar};
use crate::engine::backfill;
use crate::engine::feed::BarFeed;
use crate::engine::store::{AbsorptionStore, ImbalanceStore};

pub struct FootprintEngine {
    feed: Arc<dyn BarFeed>,
    config: DetectionConfig,

    absorption_store: AbsorptionStore,
    imbalance_store: Arc<ImbalanceStore>,
    session_engine: SessionProfileEngine,

    backfill_task: Mutex<Option<JoinHandle<()>>>,
}

impl FootprintEngine {
    pub fn new(
        feed: Arc<dyn BarFeed>,
        session_windows: Vec<SessionWindow>,
        config: DetectionConfig,
    ) -> Self {
        let session_engine =
            SessionProfileEngine::new(session_windows, feed.tick_size(), config.tpo.clone());

        Self {
            feed,
            config,
            absorption_store: AbsorptionStore::new(),
            imbalance_store: Arc::new(ImbalanceStore::new()),
            session_engine,
            backfill_task: Mutex::new(None),
        }
    }

    /// Spawn the one-time historical imbalance backfill.
    ///
    /// The host signals `ready` once volume analysis has finished and the
    /// full history is materialized. Must be called from within a tokio
    /// runtime. A second call is a no-op.
    pub fn start_backfill(&self, ready: oneshot::Receiver<()>) {
        let mut slot = self.backfill_task.lock().unwrap();
        if slot.is_some() {
            log::warn!("imbalance backfill already started, ignoring");
            return;
        }

        let handle = tokio::spawn(backfill::run_backfill(
            self.feed.clone(),
            self.imbalance_store.clone(),
            self.config.imbalance.clone(),
            ready,
        ));
        *slot = Some(handle);
    }

    /// Wait for a started backfill to finish (replay/tests).
    pub async fn wait_backfill(&self) {
        let handle = { self.backfill_task.lock().unwrap().take() };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Teardown: stop the background task so no loop outlives the owner.
    pub fn shutdown(&self) {
        if let Some(handle) = self.backfill_task.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Handle one host bar-update event for the most recent bar.
    ///
    /// Preconditions not yet met (no bars, no volume profile, not enough
    /// ATR history) skip the corresponding detector for this cycle without
    /// touching any state; everything retries cleanly on the next update.
    pub fn on_bar_update(&self, sub_bars: &[SubBar]) {
        let bar_count = self.feed.bar_count();
        if bar_count == 0 {
            return;
        }
        let offset = bar_count - 1;
        let Some(bar) = self.feed.bar(offset) else {
            return;
        };

        // The open session recomputes on every update, unthrottled
        self.session_engine.live_update(bar.time_ms, sub_bars);

        let Some(profile) = bar.volume_profile.as_ref() else {
            return;
        };
        if profile.is_empty() {
            return;
        }
        let sorted_levels = profile.sorted_levels();

        // Incremental imbalance: rescan and overwrite the newest slot
        let (buys, sells) = imbalance::scan(
            &sorted_levels,
            self.config.imbalance.ratio_threshold,
            self.config.imbalance.min_consecutive_levels,
        );
        self.imbalance_store.commit(offset, buys, sells);

        // Absorption: once per bar, never revised
        if !self.absorption_store.contains_bar(offset)
            && let Some(atr_value) = self.atr_up_to(offset)
            && let Some(hit) = absorption::detect(&sorted_levels, atr_value, &self.config.absorption)
        {
            self.absorption_store.append(AbsorptionZone {
                bar_index: offset,
                price: hit.price,
                strength: hit.strength,
                is_bullish: hit.is_bullish,
                time_ms: bar.time_ms,
            });
        }
    }

    /// Recompute sessions across loaded history (throttled internally).
    pub fn session_backfill(&self, sub_bars: &[SubBar]) {
        self.session_engine.backfill(sub_bars);
    }

    /// Transient trapped-trader detection for one bar: detect the cluster
    /// and gate it against the bar's true range. Nothing is persisted.
    pub fn trapped_for_bar(&self, offset: usize) -> Option<(TrappedCluster, TrappedConfirmation)> {
        let bar = self.feed.bar(offset)?;
        let profile = bar.volume_profile.as_ref()?;
        if profile.is_empty() {
            return None;
        }

        let cluster = trapped::detect(&profile.sorted_levels(), &self.config.trapped);
        let confirmation = trapped::confirm(
            &cluster,
            &bar,
            self.feed.tick_size(),
            &self.config.trapped,
        );
        Some((cluster, confirmation))
    }

    // --- Consumer read API: copies only ---

    pub fn absorption_zones(&self) -> Vec<AbsorptionZone> {
        self.absorption_store.snapshot()
    }

    pub fn imbalances_by_bar(&self) -> HashMap<usize, BarImbalances> {
        self.imbalance_store.snapshot()
    }

    pub fn imbalances_for_bar(&self, offset: usize) -> Option<BarImbalances> {
        self.imbalance_store.for_bar(offset)
    }

    pub fn session_snapshot(&self) -> HashMap<i64, SessionProfile> {
        self.session_engine.session_snapshot()
    }

    pub fn single_prints_by_session(&self) -> HashMap<i64, Vec<SinglePrint>> {
        self.session_engine.single_prints_by_session()
    }

    /// Clear all accumulated results (indicator reset).
    pub fn reset(&self) {
        self.absorption_store.clear();
        self.imbalance_store.clear();
        self.session_engine.clear();
    }

    // --- Internal ---

    fn atr_up_to(&self, offset: usize) -> Option<f64> {
        let bars: Vec<(f64, f64, f64)> = (0..=offset)
            .filter_map(|i| self.feed.bar(i))
            .map(|b| (b.high, b.low, b.close))
            .collect();
        atr::ema_atr(bars, self.config.absorption.atr_period)
    }
}

impl Drop for FootprintEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
