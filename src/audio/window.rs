//! Analysis windows
//!
//! Windows are periodic (the DFT-even form), which is what STFT front-ends
//! expect when frames overlap.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Window function applied to each STFT frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    #[default]
    Hann,
    Hamming,
    Blackman,
}

impl WindowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowType::Hann => "hann",
            WindowType::Hamming => "hamming",
            WindowType::Blackman => "blackman",
        }
    }

    /// Periodic window of `length` samples
    pub fn coefficients(&self, length: usize) -> Vec<f64> {
        if length == 0 {
            return Vec::new();
        }
        let n = length as f64;
        (0..length)
            .map(|i| {
                let phase = 2.0 * PI * i as f64 / n;
                match self {
                    WindowType::Hann => 0.5 - 0.5 * phase.cos(),
                    WindowType::Hamming => 0.54 - 0.46 * phase.cos(),
                    WindowType::Blackman => {
                        0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
                    }
                }
            })
            .collect()
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "hann" | "hanning" => Ok(WindowType::Hann),
            "hamming" => Ok(WindowType::Hamming),
            "blackman" => Ok(WindowType::Blackman),
            _ => bail!("Unknown window type: {}. Options: hann, hamming, blackman", s),
        }
    }
}

/// Zero-pad `window` on both sides to `n_fft` samples, keeping it centered.
///
/// A window longer than `n_fft` is an error.
pub fn pad_center(window: &[f64], n_fft: usize) -> Result<Vec<f64>> {
    if window.len() > n_fft {
        bail!(
            "Window length {} exceeds FFT size {}",
            window.len(),
            n_fft
        );
    }
    let left = (n_fft - window.len()) / 2;
    let mut padded = vec![0.0; n_fft];
    padded[left..left + window.len()].copy_from_slice(window);
    Ok(padded)
}

/// Window of `win_length` samples centered in an `n_fft` frame
pub fn frame_window(kind: WindowType, win_length: usize, n_fft: usize) -> Result<Vec<f64>> {
    pad_center(&kind.coefficients(win_length), n_fft)
}
