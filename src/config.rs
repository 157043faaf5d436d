//! YAML configuration
//!
//! Only the keys this crate uses are modeled; everything else in the file is
//! ignored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::{MelConfig, WindowType};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Feature extraction parameters
    pub feature: FeatureConfig,

    /// Frames per training batch
    #[serde(default)]
    pub batch_len: Option<usize>,
}

/// Acoustic feature extraction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Feature set name, used as a directory under the feature root
    #[serde(default = "default_label")]
    pub label: String,

    /// Sample rate in Hz
    #[serde(default = "default_fs")]
    pub fs: u32,

    /// Hop size in samples
    #[serde(default = "default_hop_size")]
    pub hop_size: usize,

    /// FFT size
    #[serde(default = "default_fftl")]
    pub fftl: usize,

    /// Window length (defaults to fftl)
    #[serde(default)]
    pub win_length: Option<usize>,

    /// Number of mel bins
    #[serde(default = "default_mlfb_dim")]
    pub mlfb_dim: usize,

    /// Lower mel frequency bound (defaults to 0)
    #[serde(default)]
    pub fmin: Option<f64>,

    /// Upper mel frequency bound (defaults to fs / 2)
    #[serde(default)]
    pub fmax: Option<f64>,

    /// Analysis windows features were extracted with
    #[serde(default = "default_window_types")]
    pub window_types: Vec<String>,
}

fn default_label() -> String {
    "default".to_string()
}

fn default_fs() -> u32 {
    22050
}

fn default_hop_size() -> usize {
    256
}

fn default_fftl() -> usize {
    1024
}

fn default_mlfb_dim() -> usize {
    80
}

fn default_window_types() -> Vec<String> {
    vec!["hann".to_string()]
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

impl FeatureConfig {
    pub fn win_length(&self) -> usize {
        self.win_length.unwrap_or(self.fftl)
    }

    pub fn fmin(&self) -> f64 {
        self.fmin.unwrap_or(0.0)
    }

    pub fn fmax(&self) -> f64 {
        self.fmax.unwrap_or(self.fs as f64 / 2.0)
    }

    /// Configured analysis windows, parsed and deduplicated in order
    pub fn windows(&self) -> Result<Vec<WindowType>> {
        let mut windows = Vec::with_capacity(self.window_types.len());
        for name in &self.window_types {
            let window: WindowType = name
                .parse()
                .with_context(|| format!("Invalid entry in window_types: '{}'", name))?;
            if !windows.contains(&window) {
                windows.push(window);
            }
        }
        Ok(windows)
    }

    /// Log-mel extraction parameters for the given window
    pub fn mel_config(&self, window: WindowType) -> MelConfig {
        MelConfig {
            sample_rate: self.fs,
            n_fft: self.fftl,
            hop_length: self.hop_size,
            win_length: Some(self.win_length()),
            window,
            n_mels: self.mlfb_dim,
            fmin: self.fmin(),
            fmax: Some(self.fmax()),
            ..Default::default()
        }
    }
}
