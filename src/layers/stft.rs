//! STFT as tensor operations
//!
//! Framing is a single `index_select` over the waveform (edge padding is
//! folded into the gather indices) and the DFT is a matmul against
//! windowed cosine/sine bases, so gradients flow back to the samples.

use anyhow::Result;
use candle_core::{DType, Device, Module, Tensor};
use std::f64::consts::PI;

use crate::audio::{frame_window, reflect_index, PadMode, StftConfig};

/// On-the-fly STFT layer
pub struct StftLayer {
    config: StftConfig,
    /// `[n_fft, n_freqs]`, window * cos
    basis_real: Tensor,
    /// `[n_fft, n_freqs]`, window * -sin
    basis_imag: Tensor,
}

impl StftLayer {
    pub fn new(config: StftConfig, dtype: DType, device: &Device) -> Result<Self> {
        config.validate()?;
        let n_fft = config.n_fft;
        let n_freqs = config.n_freqs();
        let window = frame_window(config.window, config.win_length(), n_fft)?;

        let mut real = Vec::with_capacity(n_fft * n_freqs);
        let mut imag = Vec::with_capacity(n_fft * n_freqs);
        for (j, &w) in window.iter().enumerate() {
            for k in 0..n_freqs {
                // reduce j*k mod n_fft before scaling to keep the phase exact
                let phase = 2.0 * PI * ((j * k) % n_fft) as f64 / n_fft as f64;
                real.push(w * phase.cos());
                imag.push(-w * phase.sin());
            }
        }

        let basis_real = Tensor::from_vec(real, (n_fft, n_freqs), device)?.to_dtype(dtype)?;
        let basis_imag = Tensor::from_vec(imag, (n_fft, n_freqs), device)?.to_dtype(dtype)?;

        Ok(Self {
            config,
            basis_real,
            basis_imag,
        })
    }

    pub fn config(&self) -> &StftConfig {
        &self.config
    }

    /// Gather indices for every frame sample, `[n_frames * n_fft]`
    fn frame_indices(&self, n_samples: usize) -> candle_core::Result<Vec<u32>> {
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let n_frames = self.config.n_frames(n_samples);
        if n_frames == 0 {
            return Err(candle_core::Error::Msg(format!(
                "Input of {} samples is too short for n_fft={}",
                n_samples, n_fft
            )));
        }

        let pad = if self.config.center { n_fft / 2 } else { 0 };
        if self.config.center && self.config.pad_mode == PadMode::Reflect && pad >= n_samples {
            return Err(candle_core::Error::Msg(format!(
                "Reflect padding of {} needs more than {} input samples",
                pad, n_samples
            )));
        }

        let mut indices = Vec::with_capacity(n_frames * n_fft);
        for t in 0..n_frames {
            for j in 0..n_fft {
                let pos = (t * hop + j) as isize - pad as isize;
                let idx = match self.config.pad_mode {
                    // zero-padded source already holds the pad samples
                    PadMode::Constant => (pos + pad as isize) as usize,
                    PadMode::Reflect => reflect_index(pos, n_samples),
                };
                indices.push(idx as u32);
            }
        }
        Ok(indices)
    }

    /// Real and imaginary parts, each `[batch, n_frames, n_freqs]`.
    ///
    /// With `center` and reflect padding the input must be longer than
    /// `n_fft / 2` samples, as in `torch.stft`. The offline `audio::stft`
    /// mirrors repeatedly and accepts anything from 2 samples up.
    pub fn forward_parts(&self, x: &Tensor) -> candle_core::Result<(Tensor, Tensor)> {
        let x = if x.rank() == 1 { x.unsqueeze(0)? } else { x.clone() };
        let (batch, n_samples) = x.dims2()?;
        let n_fft = self.config.n_fft;
        let n_freqs = self.config.n_freqs();

        let indices = self.frame_indices(n_samples)?;
        let n_frames = indices.len() / n_fft;
        let indices = Tensor::from_vec(indices, n_frames * n_fft, x.device())?;

        let source = if self.config.center && self.config.pad_mode == PadMode::Constant {
            x.pad_with_zeros(1, n_fft / 2, n_fft / 2)?
        } else {
            x
        };

        let frames = source
            .index_select(&indices, 1)?
            .reshape((batch * n_frames, n_fft))?;
        let real = frames
            .matmul(&self.basis_real)?
            .reshape((batch, n_frames, n_freqs))?;
        let imag = frames
            .matmul(&self.basis_imag)?
            .reshape((batch, n_frames, n_freqs))?;
        Ok((real, imag))
    }

    /// Amplitude spectrogram `[batch, n_frames, n_freqs]`
    pub fn amplitude(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let (real, imag) = self.forward_parts(x)?;
        (real.sqr()? + imag.sqr()?)?.sqrt()
    }
}

impl Module for StftLayer {
    /// `[batch, samples]` to `[batch, n_frames, n_freqs, 2]` (real, imag)
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let (real, imag) = self.forward_parts(x)?;
        Tensor::stack(&[&real, &imag], 3)
    }
}
