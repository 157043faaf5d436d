//! Feature statistics
//!
//! Running mean/variance scalers, their archive format, and the extraction
//! pass over a phase's feature files.

mod extract;
mod scaler;
mod set;

pub use extract::{
    extract_statistics, fit_scaler, speaker_independent_features, SPEAKER_DEPENDENT_FEATURES,
    SPEAKER_INDEPENDENT_FEATURES,
};
pub use scaler::Scaler;
pub use set::{ScalerEntry, ScalerSet};

/// File name of the scaler archive under a feature set directory
pub const SCALER_FILE: &str = "scaler.json";
