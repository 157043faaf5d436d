//! Log mel-filterbank layers

use anyhow::Result;
use candle_core::{DType, Device, Module, Tensor};
use std::f64::consts::LN_10;

use super::stft::StftLayer;
use crate::audio::MelConfig;

/// Projects an amplitude spectrogram onto the mel filterbank and takes `log10`
pub struct MlfbLayer {
    /// `[n_freqs, n_mels]`
    mel_basis: Tensor,
    eps: f64,
}

impl MlfbLayer {
    pub fn new(config: &MelConfig, dtype: DType, device: &Device) -> Result<Self> {
        let bank = config.filterbank()?;
        let n_mels = bank.len();
        let n_freqs = bank[0].len();
        let flat: Vec<f64> = bank.into_iter().flatten().collect();
        let mel_basis = Tensor::from_vec(flat, (n_mels, n_freqs), device)?
            .t()?
            .contiguous()?
            .to_dtype(dtype)?;
        Ok(Self {
            mel_basis,
            eps: config.eps,
        })
    }

    pub fn n_mels(&self) -> usize {
        self.mel_basis.dims()[1]
    }
}

impl Module for MlfbLayer {
    /// `[..., n_freqs]` to `[..., n_mels]`
    fn forward(&self, amplitude: &Tensor) -> candle_core::Result<Tensor> {
        let dims = amplitude.dims().to_vec();
        let n_freqs = match dims.last() {
            Some(&n) => n,
            None => {
                return Err(candle_core::Error::Msg(
                    "Mel projection needs at least one dimension".to_string(),
                ))
            }
        };
        let rows = amplitude.elem_count() / n_freqs.max(1);

        let mut out_shape = dims;
        if let Some(last) = out_shape.last_mut() {
            *last = self.n_mels();
        }

        let mel = amplitude
            .reshape((rows, n_freqs))?
            .matmul(&self.mel_basis)?
            .reshape(out_shape)?;
        let floor = mel.ones_like()?.affine(0.0, self.eps)?;
        mel.maximum(&floor)?.log()?.affine(1.0 / LN_10, 0.0)
    }
}

/// Waveform to log-mel filterbank, usable inside a training graph
pub struct LogMelFilterBankLayer {
    stft: StftLayer,
    mlfb: MlfbLayer,
}

impl LogMelFilterBankLayer {
    pub fn new(config: &MelConfig, dtype: DType, device: &Device) -> Result<Self> {
        let stft = StftLayer::new(config.stft_config(), dtype, device)?;
        let mlfb = MlfbLayer::new(config, dtype, device)?;
        tracing::debug!(
            "LogMelFilterBankLayer: n_fft={} hop={} n_mels={} dtype={:?}",
            config.n_fft,
            config.hop_length,
            config.n_mels,
            dtype
        );
        Ok(Self { stft, mlfb })
    }

    pub fn stft(&self) -> &StftLayer {
        &self.stft
    }
}

impl Module for LogMelFilterBankLayer {
    /// `[batch, samples]` to `[batch, n_frames, n_mels]`
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let amplitude = self.stft.amplitude(x)?;
        self.mlfb.forward(&amplitude)
    }
}
