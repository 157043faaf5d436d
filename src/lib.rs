//! # crank
//!
//! Feature statistics and on-the-fly acoustic features for voice conversion.
//!
//! ## Features
//!
//! - **Statistics**: per-feature and per-speaker mean/variance scalers fitted
//!   incrementally over precomputed feature archives
//! - **Reference front-end**: batch STFT and log-mel filterbank over plain slices
//! - **Layers**: the same features as candle tensor operations, differentiable
//!   with respect to the waveform
//!
//! ## Example
//!
//! ```rust,ignore
//! use candle_core::{DType, Device, Module};
//! use crank::{audio, layers::LogMelFilterBankLayer, Config};
//!
//! let conf = Config::from_file("conf/mlfb_vqvae_22050.yml")?;
//! let mel_config = conf.feature.mel_config(audio::WindowType::Hann);
//! let wav = audio::load_wav("SF1_10001.wav")?;
//!
//! let offline = audio::logmelfilterbank(&wav.samples, &mel_config)?;
//! let layer = LogMelFilterBankLayer::new(&mel_config, DType::F32, &Device::Cpu)?;
//! let online = layer.forward(&wav.to_tensor(DType::F32, &Device::Cpu)?)?;
//! ```

pub mod audio;
pub mod config;
pub mod feats;
pub mod layers;
pub mod scp;
pub mod stats;

use std::path::{Path, PathBuf};

/// Re-exports for convenience
pub use config::{Config, FeatureConfig};
pub use stats::{Scaler, ScalerSet};

/// Layout of one feature set under the feature root:
/// `<featdir>/<label>/<phase>/feats.scp` and `<featdir>/<label>/scaler.json`
#[derive(Debug, Clone)]
pub struct FeatureDir {
    root: PathBuf,
}

impl FeatureDir {
    pub fn new<P: AsRef<Path>>(featdir: P, label: &str) -> Self {
        Self {
            root: featdir.as_ref().join(label),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn feats_scp(&self, phase: &str) -> PathBuf {
        self.root.join(phase).join("feats.scp")
    }

    pub fn scaler(&self) -> PathBuf {
        self.root.join(stats::SCALER_FILE)
    }
}
