//! On-the-fly feature layers built from tensor operations
//!
//! These compute the same features as [`crate::audio`] but inside a candle
//! graph, so features can be extracted per batch during training.

mod mlfb;
mod stft;

pub use mlfb::{LogMelFilterBankLayer, MlfbLayer};
pub use stft::StftLayer;
