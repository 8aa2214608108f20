//! Configuration module for the flowprint crate.

pub mod analysis;

// Re-export commonly used items
pub use analysis::{
    AbsorptionSettings, DETECTION, DetectionConfig, ImbalanceSettings, TpoSettings,
    TrappedSettings,
};
