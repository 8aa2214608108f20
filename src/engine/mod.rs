pub mod backfill;
pub mod core;
pub mod feed;
pub mod store;

pub use self::core::FootprintEngine;
pub use feed::{BarFeed, RecordedFeed};
pub use store::{AbsorptionStore, ImbalanceStore};
