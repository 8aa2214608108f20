use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use strum::IntoEnumIterator;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;

use flowprint::utils::time_utils::epoch_ms_to_string;
use flowprint::{Cli, DETECTION, DetectorKind, FootprintEngine, Recording, RecordedFeed};

fn main() -> Result<()> {
    // A. Init Logging
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {:?}", panic_info);
    }));
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // B. Parse Args
    let args = Cli::parse();
    #[cfg(debug_assertions)]
    log::info!("Parsed arguments: {:?}", args);

    // C. Load the recording (blocking)
    let recording = Recording::load_from_path(&args.recording)?;
    log::info!(
        "Loaded recording: {} bars, {} sub-bars, {} session windows",
        recording.bars.len(),
        recording.sub_bars.len(),
        recording.session_windows.len()
    );

    // D. Replay it through the engine
    let rt = Runtime::new()?;
    rt.block_on(replay(recording, &args))
}

async fn replay(recording: Recording, args: &Cli) -> Result<()> {
    let bars = recording.to_bars();
    let windows = recording.parse_session_windows()?;
    let sub_bars = recording.sub_bars.clone();

    let feed = Arc::new(RecordedFeed::new(recording.tick_size, bars.len()));
    let engine = FootprintEngine::new(feed.clone(), windows, DETECTION.clone());

    // The backfill task idles on the readiness signal while bars stream in,
    // exactly like the host populating history behind a live chart
    let (ready_tx, ready_rx) = oneshot::channel();
    if !args.skip_backfill {
        engine.start_backfill(ready_rx);
    }

    let total = bars.len();
    for bar in bars {
        feed.push_bar(bar);
        engine.on_bar_update(&sub_bars);
    }
    log::info!("Replayed {} live bar updates", total);

    if !args.skip_backfill {
        // Full history materialized: let the backfill run to completion
        let _ = ready_tx.send(());
        engine.wait_backfill().await;
    }

    engine.session_backfill(&sub_bars);

    print_summary(&engine, total);
    Ok(())
}

fn print_summary(engine: &FootprintEngine, bar_count: usize) {
    for kind in DetectorKind::iter() {
        match kind {
            DetectorKind::Absorption => {
                let zones = engine.absorption_zones();
                log::info!("{}: {} found", kind, zones.len());
                for zone in &zones {
                    log::info!(
                        "  bar {} @ {:.4}: strength {:.2}, {}",
                        zone.bar_index,
                        zone.price,
                        zone.strength,
                        if zone.is_bullish { "bullish" } else { "bearish" }
                    );
                }
            }
            DetectorKind::Imbalance => {
                let by_bar = engine.imbalances_by_bar();
                let buys: usize = by_bar.values().map(|b| b.buys.len()).sum();
                let sells: usize = by_bar.values().map(|b| b.sells.len()).sum();
                log::info!(
                    "{}: {} buy / {} sell zones across {} computed bars",
                    kind,
                    buys,
                    sells,
                    by_bar.len()
                );
            }
            DetectorKind::TrappedTraders => {
                let mut confirmed = 0usize;
                for offset in 0..bar_count {
                    if let Some((_, confirmation)) = engine.trapped_for_bar(offset)
                        && (confirmation.sellers_confirmed || confirmation.buyers_confirmed)
                    {
                        confirmed += 1;
                    }
                }
                log::info!("{}: {} bars with confirmed clusters", kind, confirmed);
            }
            DetectorKind::SessionProfile => {
                let sessions = engine.session_snapshot();
                let prints = engine.single_prints_by_session();
                log::info!("{}: {} sessions cached", kind, sessions.len());
                for (start_ms, profile) in &sessions {
                    let print_count = prints.get(start_ms).map(|p| p.len()).unwrap_or(0);
                    log::info!(
                        "  {} -> {} levels, {} sub-bars, {} single prints",
                        epoch_ms_to_string(*start_ms),
                        profile.tpo_levels.len(),
                        profile.sub_bar_count,
                        print_count
                    );
                }
            }
        }
    }
}
