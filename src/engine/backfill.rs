//! One-time historical imbalance backfill
//!
//! The host signals readiness once its volume analysis has finished and the
//! full history is materialized; the task waits on that one-shot signal (no
//! polling), then scans every historical offset and commits results in
//! ascending order. Until a slot is committed, consumers see it as absent,
//! which is indistinguishable from — and as legitimate as — a bar whose
//! profile never loaded.

use std::sync::Arc;

use rayon::prelude::*;
use tokio::sync::oneshot;

use crate::analysis::imbalance;
use crate::config::ImbalanceSettings;
use crate::engine::feed::BarFeed;
use crate::engine::store::ImbalanceStore;

pub(crate) async fn run_backfill(
    feed: Arc<dyn BarFeed>,
    store: Arc<ImbalanceStore>,
    settings: ImbalanceSettings,
    ready: oneshot::Receiver<()>,
) {
    if ready.await.is_err() {
        // Host dropped the sender without signalling: teardown before load
        log::warn!("imbalance backfill: readiness signal dropped, aborting");
        return;
    }
    scan_history(feed.as_ref(), &store, &settings);
}

/// Scan every historical offset and commit results ascending.
///
/// The per-offset scans are independent, so they fan out across threads;
/// the indexed collect keeps them in offset order and the commit loop walks
/// that order, so the store fills strictly ascending. Bars without a profile
/// are skipped and their slots stay absent.
pub(crate) fn scan_history(
    feed: &dyn BarFeed,
    store: &ImbalanceStore,
    settings: &ImbalanceSettings,
) {
    let total = feed.total_bar_count();

    let results: Vec<Option<(Vec<_>, Vec<_>)>> = (0..total)
        .into_par_iter()
        .map(|offset| {
            let bar = feed.bar(offset)?;
            let profile = bar.volume_profile.as_ref()?;
            if profile.is_empty() {
                return None;
            }
            Some(imbalance::scan(
                &profile.sorted_levels(),
                settings.ratio_threshold,
                settings.min_consecutive_levels,
            ))
        })
        .collect();

    let mut committed = 0usize;
    for (offset, result) in results.into_iter().enumerate() {
        if let Some((buys, sells)) = result {
            store.commit(offset, buys, sells);
            committed += 1;
        }
    }

    log::info!(
        "imbalance backfill complete: {}/{} bars scanned",
        committed,
        total
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DETECTION;
    use crate::domain::{Bar, VolumeProfile};
    use crate::engine::feed::RecordedFeed;

    fn bar_with_profile(index: usize, buy_top: f64) -> Bar {
        let mut profile = VolumeProfile::new();
        profile.add_trade(100.0, 1.0, true);
        profile.add_trade(101.0, buy_top, false);
        Bar {
            index,
            time_ms: index as i64 * 60_000,
            high: 101.0,
            low: 100.0,
            close: 100.5,
            median: 100.5,
            volume_profile: Some(profile),
        }
    }

    #[test]
    fn test_scan_history_skips_profileless_bars() {
        let feed = RecordedFeed::new(0.5, 3);
        feed.push_bar(bar_with_profile(0, 20.0));
        feed.push_bar(Bar {
            index: 1,
            time_ms: 60_000,
            high: 101.0,
            low: 100.0,
            close: 100.5,
            median: 100.5,
            volume_profile: None,
        });
        feed.push_bar(bar_with_profile(2, 0.1));

        let store = ImbalanceStore::new();
        let settings = ImbalanceSettings {
            ratio_threshold: 4.0,
            min_consecutive_levels: 1,
        };
        scan_history(&feed, &store, &settings);

        // Bar 0: 20 buys over 1 sell below => one buy zone
        let slot = store.for_bar(0).expect("scanned");
        assert_eq!(slot.buys.len(), 1);

        // Bar 1 has no profile: slot absent, not empty
        assert!(store.for_bar(1).is_none());

        // Bar 2 scanned but clean
        let slot = store.for_bar(2).expect("scanned");
        assert!(slot.is_empty());
    }

    #[tokio::test]
    async fn test_backfill_waits_for_readiness() {
        let feed = Arc::new(RecordedFeed::new(0.5, 1));
        let store = Arc::new(ImbalanceStore::new());
        let (tx, rx) = oneshot::channel();

        let task = tokio::spawn(run_backfill(
            feed.clone(),
            store.clone(),
            DETECTION.imbalance.clone(),
            rx,
        ));

        // History lands before the signal fires
        feed.push_bar(bar_with_profile(0, 20.0));
        tx.send(()).unwrap();
        task.await.unwrap();

        assert!(store.for_bar(0).is_some());
    }

    #[tokio::test]
    async fn test_backfill_aborts_when_sender_dropped() {
        let feed = Arc::new(RecordedFeed::new(0.5, 1));
        feed.push_bar(bar_with_profile(0, 20.0));
        let store = Arc::new(ImbalanceStore::new());

        let (tx, rx) = oneshot::channel::<()>();
        drop(tx);
        run_backfill(feed, store.clone(), DETECTION.imbalance.clone(), rx).await;

        assert!(store.for_bar(0).is_none(), "no scan without a readiness signal");
    }
}
