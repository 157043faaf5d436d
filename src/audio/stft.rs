//! Reference short-time Fourier transform
//!
//! Batch implementation over plain slices, following librosa's `stft`
//! conventions: a periodic window centered inside the FFT frame and, when
//! `center` is set, `n_fft / 2` samples of padding on each side.

use anyhow::{bail, Result};
use num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use super::window::{frame_window, WindowType};

/// Padding applied to the signal edges when frames are centered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadMode {
    /// Mirror the signal around its first and last samples
    #[default]
    Reflect,
    /// Pad with zeros
    Constant,
}

/// STFT parameters
#[derive(Debug, Clone)]
pub struct StftConfig {
    /// FFT size
    pub n_fft: usize,
    /// Hop length between frames
    pub hop_length: usize,
    /// Window length (defaults to n_fft)
    pub win_length: Option<usize>,
    /// Window function
    pub window: WindowType,
    /// Pad the signal so frame `t` is centered at `t * hop_length`
    pub center: bool,
    /// Edge padding used with `center`
    pub pad_mode: PadMode,
}

impl Default for StftConfig {
    fn default() -> Self {
        Self {
            n_fft: 1024,
            hop_length: 256,
            win_length: None,
            window: WindowType::Hann,
            center: true,
            pad_mode: PadMode::Reflect,
        }
    }
}

impl StftConfig {
    pub fn win_length(&self) -> usize {
        self.win_length.unwrap_or(self.n_fft)
    }

    /// Number of frequency bins per frame
    pub fn n_freqs(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of frames produced for a signal of `n_samples`
    pub fn n_frames(&self, n_samples: usize) -> usize {
        let padded = if self.center {
            n_samples + 2 * (self.n_fft / 2)
        } else {
            n_samples
        };
        if padded < self.n_fft {
            0
        } else {
            1 + (padded - self.n_fft) / self.hop_length
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.n_fft == 0 || self.hop_length == 0 {
            bail!(
                "FFT size and hop length must be positive (n_fft={}, hop_length={})",
                self.n_fft,
                self.hop_length
            );
        }
        if self.win_length() > self.n_fft {
            bail!(
                "Window length {} exceeds FFT size {}",
                self.win_length(),
                self.n_fft
            );
        }
        Ok(())
    }
}

/// Index into the signal for padded position `i`, mirroring at the edges.
///
/// `pos` is relative to the start of the unpadded signal and may be negative.
pub(crate) fn reflect_index(pos: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let mut p = pos.rem_euclid(period);
    if p >= len as isize {
        p = period - p;
    }
    p as usize
}

/// Pad `samples` by `pad` on each side
pub fn pad_signal(samples: &[f64], pad: usize, mode: PadMode) -> Result<Vec<f64>> {
    if pad == 0 {
        return Ok(samples.to_vec());
    }
    match mode {
        PadMode::Constant => {
            let mut padded = vec![0.0; pad];
            padded.extend_from_slice(samples);
            padded.extend(std::iter::repeat(0.0).take(pad));
            Ok(padded)
        }
        PadMode::Reflect => {
            if samples.len() < 2 {
                bail!(
                    "Reflect padding needs at least 2 samples, got {}",
                    samples.len()
                );
            }
            let len = samples.len();
            Ok((-(pad as isize)..(len + pad) as isize)
                .map(|pos| samples[reflect_index(pos, len)])
                .collect())
        }
    }
}

/// Short-time Fourier transform of `samples`.
///
/// Returns `[n_frames][n_fft / 2 + 1]`.
pub fn stft(samples: &[f64], config: &StftConfig) -> Result<Vec<Vec<Complex<f64>>>> {
    config.validate()?;
    let n_fft = config.n_fft;
    let window = frame_window(config.window, config.win_length(), n_fft)?;

    let padded = if config.center {
        pad_signal(samples, n_fft / 2, config.pad_mode)?
    } else {
        samples.to_vec()
    };

    let n_frames = config.n_frames(samples.len());
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_fft);

    let mut result = Vec::with_capacity(n_frames);
    let mut buffer = vec![Complex::new(0.0f64, 0.0); n_fft];

    for t in 0..n_frames {
        let start = t * config.hop_length;
        for (j, slot) in buffer.iter_mut().enumerate() {
            *slot = Complex::new(padded[start + j] * window[j], 0.0);
        }
        fft.process(&mut buffer);
        result.push(buffer[..config.n_freqs()].to_vec());
    }

    Ok(result)
}

/// Magnitude spectrogram `|STFT|`, `[n_frames][n_fft / 2 + 1]`
pub fn magnitude(samples: &[f64], config: &StftConfig) -> Result<Vec<Vec<f64>>> {
    Ok(stft(samples, config)?
        .into_iter()
        .map(|frame| frame.iter().map(|c| c.norm()).collect())
        .collect())
}
