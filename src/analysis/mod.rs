pub mod absorption;
pub mod atr;
pub mod imbalance;
pub mod session_profile;
pub mod trapped;

pub use absorption::{AbsorptionHit, AbsorptionZone};
pub use imbalance::{BarImbalances, ImbalanceZone};
pub use session_profile::{SessionProfile, SessionProfileEngine, SinglePrint, TpoLevel};
pub use trapped::{TrappedCluster, TrappedConfirmation};

use std::fmt;

/// The pattern families this crate detects; the replay binary iterates these
/// for its end-of-run summary.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum_macros::EnumIter)]
pub enum DetectorKind {
    Absorption,
    Imbalance,
    TrappedTraders,
    SessionProfile,
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DetectorKind::Absorption => write!(f, "Absorption zones"),
            DetectorKind::Imbalance => write!(f, "Order-flow imbalances"),
            DetectorKind::TrappedTraders => write!(f, "Trapped traders"),
            DetectorKind::SessionProfile => write!(f, "Session TPO profiles"),
        }
    }
}
