//! Mel filterbank and reference log-mel features
//!
//! The filterbank follows librosa's `filters.mel` (Slaney mel scale with
//! area normalization by default). The same matrix is shared with the
//! tensor layers so both paths project onto identical filters.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::stft::{self, PadMode, StftConfig};
use super::window::WindowType;

/// Floor applied before taking the logarithm
pub const LOG_EPS: f64 = 1e-10;

/// Mel scale formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MelScale {
    /// Linear below 1 kHz, logarithmic above (Slaney's Auditory Toolbox)
    #[default]
    Slaney,
    /// `2595 * log10(1 + f / 700)`
    Htk,
}

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Converts frequency in Hz to mels.
pub fn hz_to_mel(hz: f64, scale: MelScale) -> f64 {
    match scale {
        MelScale::Htk => 2595.0 * (1.0 + hz / 700.0).log10(),
        MelScale::Slaney => {
            if hz >= MIN_LOG_HZ {
                MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
            } else {
                hz / F_SP
            }
        }
    }
}

/// Converts mels back to Hz.
pub fn mel_to_hz(mel: f64, scale: MelScale) -> f64 {
    match scale {
        MelScale::Htk => 700.0 * (10.0f64.powf(mel / 2595.0) - 1.0),
        MelScale::Slaney => {
            if mel >= MIN_LOG_MEL {
                MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
            } else {
                F_SP * mel
            }
        }
    }
}

/// Creates the mel filterbank matrix.
///
/// Returns `[n_mels][n_fft / 2 + 1]`. Each triangle is scaled by
/// `2 / (f_right - f_left)` so filters have roughly equal area.
pub fn mel_filterbank(
    sample_rate: u32,
    n_fft: usize,
    n_mels: usize,
    fmin: f64,
    fmax: f64,
    scale: MelScale,
) -> Result<Vec<Vec<f64>>> {
    let nyquist = sample_rate as f64 / 2.0;
    if n_mels == 0 || n_fft == 0 {
        bail!("n_mels and n_fft must be positive (n_mels={}, n_fft={})", n_mels, n_fft);
    }
    if !(0.0 <= fmin && fmin < fmax && fmax <= nyquist) {
        bail!(
            "Invalid mel frequency range: fmin={} fmax={} (nyquist {})",
            fmin,
            fmax,
            nyquist
        );
    }

    let n_freqs = n_fft / 2 + 1;
    let fft_freqs: Vec<f64> = (0..n_freqs)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect();

    let mel_min = hz_to_mel(fmin, scale);
    let mel_max = hz_to_mel(fmax, scale);
    let mel_f: Vec<f64> = (0..n_mels + 2)
        .map(|i| {
            let m = mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64;
            mel_to_hz(m, scale)
        })
        .collect();

    let mut weights = vec![vec![0.0f64; n_freqs]; n_mels];
    for (i, filter) in weights.iter_mut().enumerate() {
        let (left, center, right) = (mel_f[i], mel_f[i + 1], mel_f[i + 2]);
        let enorm = 2.0 / (right - left);
        for (w, &f) in filter.iter_mut().zip(fft_freqs.iter()) {
            let lower = (f - left) / (center - left);
            let upper = (right - f) / (right - center);
            *w = lower.min(upper).max(0.0) * enorm;
        }
    }

    Ok(weights)
}

/// Configuration for log-mel filterbank extraction
#[derive(Debug, Clone)]
pub struct MelConfig {
    /// Sample rate of input audio
    pub sample_rate: u32,
    /// FFT window size
    pub n_fft: usize,
    /// Hop length between frames
    pub hop_length: usize,
    /// Window length (defaults to n_fft)
    pub win_length: Option<usize>,
    /// Window function
    pub window: WindowType,
    /// Center frames with `n_fft / 2` samples of padding
    pub center: bool,
    /// Number of mel bands
    pub n_mels: usize,
    /// Minimum frequency for mel filterbank
    pub fmin: f64,
    /// Maximum frequency for mel filterbank (defaults to sample_rate / 2)
    pub fmax: Option<f64>,
    /// Mel scale formula
    pub scale: MelScale,
    /// Floor applied before the logarithm
    pub eps: f64,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            n_fft: 1024,
            hop_length: 256,
            win_length: None,
            window: WindowType::Hann,
            center: true,
            n_mels: 80,
            fmin: 0.0,
            fmax: None,
            scale: MelScale::Slaney,
            eps: LOG_EPS,
        }
    }
}

impl MelConfig {
    pub fn fmax(&self) -> f64 {
        self.fmax.unwrap_or(self.sample_rate as f64 / 2.0)
    }

    pub fn stft_config(&self) -> StftConfig {
        StftConfig {
            n_fft: self.n_fft,
            hop_length: self.hop_length,
            win_length: self.win_length,
            window: self.window,
            center: self.center,
            pad_mode: PadMode::Reflect,
        }
    }

    /// Mel filterbank for this configuration, `[n_mels][n_fft / 2 + 1]`
    pub fn filterbank(&self) -> Result<Vec<Vec<f64>>> {
        mel_filterbank(
            self.sample_rate,
            self.n_fft,
            self.n_mels,
            self.fmin,
            self.fmax(),
            self.scale,
        )
    }
}

/// Offline log-mel filterbank extractor
pub struct MelSpectrogram {
    config: MelConfig,
    /// Precomputed mel filterbank
    mel_basis: Vec<Vec<f64>>,
}

impl MelSpectrogram {
    pub fn new(config: MelConfig) -> Result<Self> {
        config.stft_config().validate()?;
        let mel_basis = config.filterbank()?;
        Ok(Self { config, mel_basis })
    }

    pub fn config(&self) -> &MelConfig {
        &self.config
    }

    pub fn mel_basis(&self) -> &[Vec<f64>] {
        &self.mel_basis
    }

    /// Mel-projected amplitude spectrogram, `[n_frames][n_mels]`
    pub fn compute(&self, samples: &[f64]) -> Result<Vec<Vec<f64>>> {
        let spc = stft::magnitude(samples, &self.config.stft_config())?;
        Ok(spc.iter().map(|frame| self.project(frame)).collect())
    }

    /// `log10(max(eps, |STFT| · melᵀ))`, `[n_frames][n_mels]`
    pub fn compute_log(&self, samples: &[f64]) -> Result<Vec<Vec<f64>>> {
        let eps = self.config.eps;
        Ok(self
            .compute(samples)?
            .into_iter()
            .map(|frame| frame.into_iter().map(|v| v.max(eps).log10()).collect())
            .collect())
    }

    fn project(&self, frame: &[f64]) -> Vec<f64> {
        self.mel_basis
            .iter()
            .map(|filter| filter.iter().zip(frame.iter()).map(|(w, a)| w * a).sum())
            .collect()
    }
}

/// Log-mel filterbank of `samples` in one call
pub fn logmelfilterbank(samples: &[f64], config: &MelConfig) -> Result<Vec<Vec<f64>>> {
    MelSpectrogram::new(config.clone())?.compute_log(samples)
}
