//! Validation tests comparing the on-the-fly feature layers against the
//! offline reference front-end
//!
//! Both paths run on the same utterance read back from a WAV file, with the
//! feature parameters taken from `tests/data/mlfb_vqvae_22050.yml`.

use anyhow::Result;
use candle_core::{DType, Device, Module, Tensor};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use crank::audio::{self, AudioBuffer, MelConfig, StftConfig, WindowType};
use crank::layers::{LogMelFilterBankLayer, StftLayer};
use crank::Config;

/// `assert_almost_equal(decimal=4)`
const MLFB_TOLERANCE: f64 = 1.5e-4;
/// `assert_almost_equal(decimal=7)`
const STFT_TOLERANCE: f64 = 1.5e-7;

fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

fn load_conf() -> Result<Config> {
    Config::from_file(data_dir().join("mlfb_vqvae_22050.yml"))
}

/// Voiced-speech-like test signal: a harmonic tone with vibrato over a
/// white noise floor, 2.5 seconds long
fn synth_utterance(fs: u32) -> Vec<f64> {
    let n = (fs as f64 * 2.5) as usize;
    let mut state = 0x9e37_79b9u32;
    let mut phase = 0.0f64;
    (0..n)
        .map(|i| {
            let t = i as f64 / fs as f64;
            let f0 = 140.0 + 25.0 * (2.0 * PI * 3.0 * t).sin();
            phase += 2.0 * PI * f0 / fs as f64;
            let voiced: f64 = (1..=20)
                .map(|h| (h as f64 * phase).sin() * 0.25 / h as f64)
                .sum();
            let envelope = 0.6 + 0.4 * (2.0 * PI * 0.7 * t).sin();

            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let noise = state as f64 / u32::MAX as f64 - 0.5;

            voiced * envelope + 0.1 * noise
        })
        .collect()
}

/// Write the test utterance to a WAV file and read it back
fn load_utterance(fs: u32) -> Result<AudioBuffer> {
    let dir = tempfile::tempdir()?;
    let wavf = dir.path().join("SF1_10001.wav");
    audio::save_wav(&wavf, &synth_utterance(fs), fs)?;
    audio::load_wav(&wavf)
}

fn layer_output(layer: &impl Module, x: &[f64], dtype: DType) -> Result<Vec<Vec<f64>>> {
    let raw = Tensor::new(x, &Device::Cpu)?.to_dtype(dtype)?.unsqueeze(0)?;
    let out = layer.forward(&raw)?.squeeze(0)?.to_dtype(DType::F64)?;
    Ok(out.to_vec2()?)
}

/// Shapes must match exactly and every element within `tolerance`
fn assert_almost_equal(name: &str, reference: &[Vec<f64>], actual: &[Vec<f64>], tolerance: f64) {
    assert_eq!(reference.len(), actual.len(), "{}: frame count", name);
    assert_eq!(reference[0].len(), actual[0].len(), "{}: bin count", name);

    let mut max_diff = 0.0f64;
    for (r, a) in reference.iter().zip(actual.iter()) {
        assert_eq!(r.len(), a.len());
        for (x, y) in r.iter().zip(a.iter()) {
            max_diff = max_diff.max((x - y).abs());
        }
    }
    println!("  {}: max_diff={:.3e}", name, max_diff);
    assert!(
        max_diff < tolerance,
        "{}: max_diff {} exceeds {}",
        name,
        max_diff,
        tolerance
    );
}

#[test]
fn test_feature_onthefly() -> Result<()> {
    let conf = load_conf()?;
    let x = load_utterance(conf.feature.fs)?;
    let mel_config = conf.feature.mel_config(WindowType::Hann);

    let mlfb_ref = audio::logmelfilterbank(&x.samples, &mel_config)?;

    let mlfb_layer = LogMelFilterBankLayer::new(&mel_config, DType::F32, &Device::Cpu)?;
    let mlfb_onthefly = layer_output(&mlfb_layer, &x.samples, DType::F32)?;

    assert_eq!(mlfb_ref[0].len(), conf.feature.mlfb_dim);
    assert_almost_equal("mlfb", &mlfb_ref, &mlfb_onthefly, MLFB_TOLERANCE);
    Ok(())
}

#[test]
fn test_feature_onthefly_padding() -> Result<()> {
    // check equivalence when discarding frames like a data loader does
    let conf = load_conf()?;
    let x = load_utterance(conf.feature.fs)?;
    let batch_len = conf.batch_len.expect("batch_len in test config");
    let fftl = conf.feature.fftl;
    let hop_size = conf.feature.hop_size;

    let mel_config = conf.feature.mel_config(WindowType::Hann);
    let mlfb_ref = audio::logmelfilterbank(&x.samples, &mel_config)?;

    let mlfb_layer = LogMelFilterBankLayer::new(
        &MelConfig {
            center: false,
            ..mel_config
        },
        DType::F32,
        &Device::Cpu,
    )?;

    // the first window must lie inside the signal
    let first = (fftl / 2).div_ceil(hop_size);
    for p in [first, 17, 50, 99] {
        let expected = &mlfb_ref[p..p + batch_len];
        let x_mod = x.slice(
            p * hop_size - fftl / 2,
            p * hop_size + hop_size * batch_len - 1 + fftl / 2,
        );
        assert_eq!(x_mod.len(), hop_size * batch_len - 1 + fftl);

        let mlfb_onthefly = layer_output(&mlfb_layer, x_mod, DType::F32)?;
        assert_almost_equal(&format!("mlfb[{}..]", p), expected, &mlfb_onthefly, MLFB_TOLERANCE);
    }
    Ok(())
}

#[test]
fn test_stft_onthefly() -> Result<()> {
    let conf = load_conf()?;
    let x = load_utterance(conf.feature.fs)?;

    let stft_config = StftConfig {
        n_fft: conf.feature.fftl,
        hop_length: conf.feature.hop_size,
        win_length: Some(conf.feature.win_length()),
        window: WindowType::Hann,
        ..Default::default()
    };
    let spc_ref = audio::magnitude(&x.samples, &stft_config)?;

    let stft_layer = StftLayer::new(stft_config, DType::F64, &Device::Cpu)?;
    let raw = Tensor::new(x.samples.as_slice(), &Device::Cpu)?.unsqueeze(0)?;
    let stft = stft_layer.forward(&raw)?;
    let (batch, _, n_freqs, parts) = stft.dims4()?;
    assert_eq!((batch, n_freqs, parts), (1, conf.feature.fftl / 2 + 1, 2));

    let real = stft.narrow(3, 0, 1)?.squeeze(3)?;
    let imag = stft.narrow(3, 1, 1)?.squeeze(3)?;
    let spc_onthefly: Vec<Vec<f64>> = (real.sqr()? + imag.sqr()?)?
        .sqrt()?
        .squeeze(0)?
        .to_vec2()?;

    assert_almost_equal("spc", &spc_ref, &spc_onthefly, STFT_TOLERANCE);
    Ok(())
}

#[test]
fn test_feature_onthefly_other_windows() -> Result<()> {
    let conf = load_conf()?;
    let x = load_utterance(conf.feature.fs)?;

    for window in [WindowType::Hamming, WindowType::Blackman] {
        let mel_config = conf.feature.mel_config(window);
        let mlfb_ref = audio::logmelfilterbank(&x.samples, &mel_config)?;
        let mlfb_layer = LogMelFilterBankLayer::new(&mel_config, DType::F32, &Device::Cpu)?;
        let mlfb_onthefly = layer_output(&mlfb_layer, &x.samples, DType::F32)?;
        assert_almost_equal(
            &format!("mlfb_{}", window),
            &mlfb_ref,
            &mlfb_onthefly,
            MLFB_TOLERANCE,
        );
    }
    Ok(())
}

#[test]
fn test_batched_utterances() -> Result<()> {
    let conf = load_conf()?;
    let x = load_utterance(conf.feature.fs)?;
    let mel_config = conf.feature.mel_config(WindowType::Hann);
    let layer = LogMelFilterBankLayer::new(&mel_config, DType::F32, &Device::Cpu)?;

    let len = 22050;
    let a = &x.samples[..len];
    let b = &x.samples[len..2 * len];
    let batch = Tensor::from_vec([a, b].concat(), (2, len), &Device::Cpu)?.to_dtype(DType::F32)?;
    let out = layer.forward(&batch)?;
    assert_eq!(out.dims()[0], 2);

    for (i, utt) in [a, b].iter().enumerate() {
        let single: Vec<Vec<f64>> = out.get(i)?.to_dtype(DType::F64)?.to_vec2()?;
        let reference = audio::logmelfilterbank(utt, &mel_config)?;
        assert_almost_equal(&format!("batch[{}]", i), &reference, &single, MLFB_TOLERANCE);
    }
    Ok(())
}

#[test]
fn test_gradient_flows_to_waveform() -> Result<()> {
    let conf = load_conf()?;
    let x = load_utterance(conf.feature.fs)?;
    let mel_config = conf.feature.mel_config(WindowType::Hann);
    let layer = LogMelFilterBankLayer::new(&mel_config, DType::F32, &Device::Cpu)?;

    let segment = x.slice(0, 8192);
    let raw = Tensor::new(segment, &Device::Cpu)?
        .to_dtype(DType::F32)?
        .unsqueeze(0)?;
    let var = candle_core::Var::from_tensor(&raw)?;

    let loss = layer.forward(var.as_tensor())?.mean_all()?;
    let grads = loss.backward()?;
    let grad = grads
        .get(var.as_tensor())
        .ok_or_else(|| anyhow::anyhow!("no gradient for waveform"))?;
    assert_eq!(grad.dims(), &[1, segment.len()]);

    let values: Vec<f32> = grad.flatten_all()?.to_vec1()?;
    assert!(values.iter().all(|v| v.is_finite()));
    assert!(values.iter().any(|&v| v != 0.0));
    Ok(())
}
