//! Audio I/O utilities

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Audio buffer holding raw waveform data
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono audio samples in [-1.0, 1.0] range
    pub samples: Vec<f64>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a new audio buffer
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Create from a Candle tensor (assumed shape: [samples] or [1, samples])
    pub fn from_tensor(tensor: &Tensor, sample_rate: u32) -> Result<Self> {
        let tensor = if tensor.dims().len() == 2 {
            tensor.squeeze(0)?
        } else {
            tensor.clone()
        };

        let samples: Vec<f64> = tensor.to_dtype(DType::F64)?.to_vec1()?;
        Ok(Self::new(samples, sample_rate))
    }

    /// Convert to a `[1, samples]` tensor, the batch layout the feature layers take
    pub fn to_tensor(&self, dtype: DType, device: &Device) -> Result<Tensor> {
        Ok(Tensor::new(self.samples.as_slice(), device)?
            .to_dtype(dtype)?
            .unsqueeze(0)?)
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in `[start, end)`, clamped to the buffer
    pub fn slice(&self, start: usize, end: usize) -> &[f64] {
        let end = end.min(self.samples.len());
        let start = start.min(end);
        &self.samples[start..end]
    }

    /// Save to WAV file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_wav(path, &self.samples, self.sample_rate)
    }

    /// Load from WAV file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_wav(path)
    }
}

/// Load a WAV file into an AudioBuffer
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let path = path.as_ref();
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels as usize;

    let samples: Vec<f64> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            let max_val = (1i64 << (bits - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    // Convert to mono by averaging channels
    let mono_samples = if channels > 1 {
        samples
            .chunks(channels)
            .map(|chunk| chunk.iter().sum::<f64>() / channels as f64)
            .collect()
    } else {
        samples
    };

    tracing::debug!(
        "Loaded {} ({} samples, {} Hz)",
        path.display(),
        mono_samples.len(),
        sample_rate
    );
    Ok(AudioBuffer::new(mono_samples, sample_rate))
}

/// Save samples to a 16-bit PCM WAV file
pub fn save_wav<P: AsRef<Path>>(path: P, samples: &[f64], sample_rate: u32) -> Result<()> {
    let path = path.as_ref();
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

    for &sample in samples {
        let v = (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        writer.write_sample(v)?;
    }

    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_buffer_duration() {
        let buffer = AudioBuffer::new(vec![0.0; 22050], 22050);
        assert!((buffer.duration() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_slice_clamps() {
        let buffer = AudioBuffer::new(vec![1.0, 2.0, 3.0], 16000);
        assert_eq!(buffer.slice(1, 10), &[2.0, 3.0]);
        assert!(buffer.slice(5, 10).is_empty());
    }

    #[test]
    fn test_wav_roundtrip_16bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.01).sin() * 0.5).collect();
        save_wav(&path, &samples, 22050).unwrap();

        let loaded = load_wav(&path).unwrap();
        assert_eq!(loaded.sample_rate, 22050);
        assert_eq!(loaded.len(), samples.len());
        for (a, b) in loaded.samples.iter().zip(samples.iter()) {
            assert!((a - b).abs() < 1.0 / 16384.0);
        }
    }

    #[test]
    fn test_tensor_roundtrip() {
        let buffer = AudioBuffer::new(vec![0.25, -0.5, 0.75], 22050);
        let tensor = buffer.to_tensor(DType::F32, &Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[1, 3]);
        let back = AudioBuffer::from_tensor(&tensor, 22050).unwrap();
        assert_eq!(back.samples, buffer.samples);
    }
}
