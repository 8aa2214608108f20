// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod utils;

// Re-export commonly used types
pub use analysis::{
    AbsorptionZone, BarImbalances, DetectorKind, ImbalanceZone, SessionProfile,
    SessionProfileEngine, SinglePrint, TpoLevel, TrappedCluster, TrappedConfirmation,
};
pub use config::{DETECTION, DetectionConfig};
pub use data::Recording;
pub use domain::{Bar, PriceLevel, SessionWindow, SubBar, VolumeProfile};
pub use engine::{BarFeed, FootprintEngine, RecordedFeed};

// CLI argument parsing
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON recording of host feed data
    pub recording: PathBuf,

    /// Replay live updates only, without the historical backfill
    #[arg(long, default_value_t = false)]
    pub skip_backfill: bool,
}
