//! Per-utterance feature archives
//!
//! Each utterance's features live in one safetensors file with a tensor per
//! feature name (`mlfb`, `mcep`, `lcf0`, ...), laid out `[frames]` or
//! `[frames, dim]`.

use anyhow::{bail, Context, Result};
use candle_core::safetensors::MmapedSafetensors;
use candle_core::{DType, Device, Tensor};
use std::collections::HashMap;
use std::path::Path;

/// Load feature `ext` from `path` as a `[frames][dim]` matrix.
///
/// One-dimensional features become a single column. Only `ext` is decoded;
/// the rest of the archive stays mapped but untouched.
pub fn load_feature<P: AsRef<Path>>(path: P, ext: &str) -> Result<Vec<Vec<f64>>> {
    let path = path.as_ref();
    // SAFETY: feature archives are not modified while extraction runs
    let archive = unsafe { MmapedSafetensors::new(path) }
        .with_context(|| format!("Failed to load feature file: {}", path.display()))?;
    if archive.get(ext).is_err() {
        bail!("Feature '{}' not found in {}", ext, path.display());
    }
    let tensor = archive
        .load(ext, &Device::Cpu)
        .with_context(|| format!("Feature '{}' in {}", ext, path.display()))?;
    to_matrix(&tensor).with_context(|| format!("Feature '{}' in {}", ext, path.display()))
}

fn to_matrix(tensor: &Tensor) -> Result<Vec<Vec<f64>>> {
    let tensor = tensor.to_dtype(DType::F64)?;
    let tensor = match tensor.rank() {
        1 => tensor.unsqueeze(1)?,
        2 => tensor,
        rank => bail!("expected a 1-D or 2-D feature, got rank {}", rank),
    };
    Ok(tensor.to_vec2()?)
}

/// Write named `[frames][dim]` features to a safetensors file
pub fn save_features<P: AsRef<Path>>(path: P, features: &[(&str, Vec<Vec<f64>>)]) -> Result<()> {
    let path = path.as_ref();
    let mut tensors: HashMap<String, Tensor> = HashMap::new();
    for (name, rows) in features {
        let frames = rows.len();
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != dim) {
            bail!("Feature '{}' has rows of different widths", name);
        }
        let flat: Vec<f32> = rows.iter().flatten().map(|&v| v as f32).collect();
        let tensor = Tensor::from_vec(flat, (frames, dim), &Device::Cpu)?;
        tensors.insert(name.to_string(), tensor);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    candle_core::safetensors::save(&tensors, path)
        .with_context(|| format!("Failed to write feature file: {}", path.display()))?;
    Ok(())
}
