//! Incremental standardization statistics

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::feats::load_feature;

/// Per-dimension running mean and variance
///
/// Batches are merged with the pairwise update of Chan, Golub and LeVeque,
/// so the result does not depend on how rows are split into batches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    /// Rows seen so far
    pub n_samples_seen: u64,
    pub mean: Vec<f64>,
    /// Population variance (ddof = 0)
    pub var: Vec<f64>,
    /// Standard deviation, with zero variance mapped to 1
    pub scale: Vec<f64>,
}

impl Scaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feature dimension, 0 before the first non-empty batch
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Fold a batch of `[rows][dim]` data into the statistics
    pub fn partial_fit(&mut self, rows: &[Vec<f64>]) -> Result<()> {
        let Some(first) = rows.first() else {
            return Ok(());
        };
        let dim = first.len();
        if dim == 0 {
            bail!("Feature rows must have at least one dimension");
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != dim) {
            bail!(
                "Row {} has {} dimensions, expected {}",
                bad,
                rows[bad].len(),
                dim
            );
        }
        if self.n_samples_seen > 0 && dim != self.dim() {
            bail!(
                "Batch has {} dimensions but scaler was fitted with {}",
                dim,
                self.dim()
            );
        }

        let n_new = rows.len() as f64;
        let mut batch_mean = vec![0.0; dim];
        for row in rows {
            for (m, &v) in batch_mean.iter_mut().zip(row.iter()) {
                *m += v;
            }
        }
        for m in batch_mean.iter_mut() {
            *m /= n_new;
        }

        let mut batch_m2 = vec![0.0; dim];
        for row in rows {
            for ((s, &v), &m) in batch_m2.iter_mut().zip(row.iter()).zip(batch_mean.iter()) {
                let d = v - m;
                *s += d * d;
            }
        }

        if self.n_samples_seen == 0 {
            self.var = batch_m2.iter().map(|s| s / n_new).collect();
            self.mean = batch_mean;
        } else {
            let n_old = self.n_samples_seen as f64;
            let n_total = n_old + n_new;
            for d in 0..dim {
                let delta = batch_mean[d] - self.mean[d];
                let m2 = self.var[d] * n_old + batch_m2[d] + delta * delta * n_old * n_new / n_total;
                self.mean[d] += delta * n_new / n_total;
                self.var[d] = m2 / n_total;
            }
        }

        self.n_samples_seen += rows.len() as u64;
        self.scale = self
            .var
            .iter()
            .map(|&v| if v == 0.0 { 1.0 } else { v.sqrt() })
            .collect();
        Ok(())
    }

    /// `partial_fit` over feature `ext` of every file, in order
    pub fn fit_files<P: AsRef<Path>>(&mut self, files: &[P], ext: &str) -> Result<()> {
        for path in files {
            let rows = load_feature(path, ext)?;
            self.partial_fit(&rows)?;
        }
        Ok(())
    }

    /// `(x - mean) / scale`, row by row
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.check_rows(rows)?;
        Ok(rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(self.scale.iter()))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect()
            })
            .collect())
    }

    /// `x * scale + mean`, row by row
    pub fn inverse_transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.check_rows(rows)?;
        Ok(rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(self.scale.iter()))
                    .map(|(v, (m, s))| v * s + m)
                    .collect()
            })
            .collect())
    }

    fn check_rows(&self, rows: &[Vec<f64>]) -> Result<()> {
        if self.n_samples_seen == 0 {
            bail!("Scaler has not been fitted");
        }
        if let Some(row) = rows.iter().find(|r| r.len() != self.dim()) {
            bail!(
                "Row has {} dimensions, scaler expects {}",
                row.len(),
                self.dim()
            );
        }
        Ok(())
    }
}
