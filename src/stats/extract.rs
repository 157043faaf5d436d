//! Speaker-independent and speaker-dependent statistics extraction

use anyhow::Result;
use std::path::PathBuf;

use super::scaler::Scaler;
use super::set::ScalerSet;
use crate::audio::WindowType;
use crate::config::FeatureConfig;
use crate::scp::{FeatsScp, ScpDir};

/// Features normalized with statistics over the whole corpus
pub const SPEAKER_INDEPENDENT_FEATURES: [&str; 4] = ["mlfb", "mcep", "lcf0", "cenergy"];

/// Features that also get per-speaker statistics
pub const SPEAKER_DEPENDENT_FEATURES: [&str; 2] = ["lcf0", "cenergy"];

/// Speaker-independent feature names for a feature configuration.
///
/// Every non-Hann analysis window adds its own `mlfb_<window>` and
/// `lsp_<window>` features. Unknown window names are an error.
pub fn speaker_independent_features(conf: &FeatureConfig) -> Result<Vec<String>> {
    let mut feats: Vec<String> = SPEAKER_INDEPENDENT_FEATURES
        .iter()
        .map(|s| s.to_string())
        .collect();
    for window in conf.windows()? {
        if window != WindowType::Hann {
            feats.push(format!("mlfb_{}", window.as_str()));
            feats.push(format!("lsp_{}", window.as_str()));
        }
    }
    Ok(feats)
}

/// Fit a fresh scaler over feature `ext` of `files`
pub fn fit_scaler(files: &[PathBuf], ext: &str) -> Result<Scaler> {
    let mut scaler = Scaler::new();
    scaler.fit_files(files, ext)?;
    Ok(scaler)
}

/// Fit every global and per-speaker scaler for one phase
pub fn extract_statistics(conf: &FeatureConfig, scp: &ScpDir, feats: &FeatsScp) -> Result<ScalerSet> {
    let mut scalers = ScalerSet::new();
    let files = feats.files();

    for ext in speaker_independent_features(conf)? {
        let scaler = fit_scaler(&files, &ext)?;
        tracing::info!("# of samples for {}: {}", ext, scaler.n_samples_seen);
        scalers.insert_global(&ext, scaler)?;
    }

    for ext in SPEAKER_DEPENDENT_FEATURES {
        for spkr in scp.speakers() {
            let files_sd = scp.feature_files(feats, spkr)?;
            let scaler = fit_scaler(&files_sd, ext)?;
            tracing::info!(
                "# of samples {} of {}: {} samples",
                ext,
                spkr,
                scaler.n_samples_seen
            );
            scalers.insert_speaker(spkr, ext, scaler)?;
        }
    }

    Ok(scalers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_feature_list_per_window() {
        let conf = Config::from_yaml("feature:\n  window_types: [hann, hamming, blackman]\n")
            .unwrap()
            .feature;
        assert_eq!(
            speaker_independent_features(&conf).unwrap(),
            vec![
                "mlfb",
                "mcep",
                "lcf0",
                "cenergy",
                "mlfb_hamming",
                "lsp_hamming",
                "mlfb_blackman",
                "lsp_blackman"
            ]
        );
    }

    #[test]
    fn test_feature_list_hann_only() {
        let conf = Config::from_yaml("feature:\n  fs: 16000\n").unwrap().feature;
        assert_eq!(speaker_independent_features(&conf).unwrap().len(), 4);
    }

    #[test]
    fn test_feature_list_rejects_unknown_window() {
        let conf = Config::from_yaml("feature:\n  window_types: [hann, hammming]\n")
            .unwrap()
            .feature;
        let err = speaker_independent_features(&conf).unwrap_err();
        assert!(format!("{:#}", err).contains("hammming"));
    }
}
