//! Collection of fitted scalers and its JSON archive

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::scaler::Scaler;

/// Top-level archive entry: a global feature scaler or a speaker's scalers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalerEntry {
    Feature(Scaler),
    Speaker(BTreeMap<String, Scaler>),
}

/// Scalers keyed by feature name, plus per-speaker scalers keyed by
/// speaker ID then feature name
///
/// Both kinds share one top-level namespace in the archive, so a speaker
/// may not be named after a global feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScalerSet {
    entries: BTreeMap<String, ScalerEntry>,
}

impl ScalerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_global(&mut self, ext: &str, scaler: Scaler) -> Result<()> {
        if let Some(ScalerEntry::Speaker(_)) = self.entries.get(ext) {
            bail!("'{}' is already used as a speaker ID", ext);
        }
        self.entries
            .insert(ext.to_string(), ScalerEntry::Feature(scaler));
        Ok(())
    }

    pub fn insert_speaker(&mut self, spkr: &str, ext: &str, scaler: Scaler) -> Result<()> {
        let entry = self
            .entries
            .entry(spkr.to_string())
            .or_insert_with(|| ScalerEntry::Speaker(BTreeMap::new()));
        match entry {
            ScalerEntry::Speaker(map) => {
                map.insert(ext.to_string(), scaler);
                Ok(())
            }
            ScalerEntry::Feature(_) => {
                bail!("Speaker ID '{}' collides with a global feature name", spkr)
            }
        }
    }

    pub fn global(&self, ext: &str) -> Option<&Scaler> {
        match self.entries.get(ext)? {
            ScalerEntry::Feature(s) => Some(s),
            ScalerEntry::Speaker(_) => None,
        }
    }

    pub fn speaker(&self, spkr: &str, ext: &str) -> Option<&Scaler> {
        match self.entries.get(spkr)? {
            ScalerEntry::Speaker(map) => map.get(ext),
            ScalerEntry::Feature(_) => None,
        }
    }

    /// Global feature names, sorted
    pub fn features(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, e)| matches!(e, ScalerEntry::Feature(_)))
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Speaker IDs, sorted
    pub fn speakers(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, e)| matches!(e, ScalerEntry::Speaker(_)))
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write scaler: {}", path.display()))?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scaler: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse scaler: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted(values: &[f64]) -> Scaler {
        let rows: Vec<Vec<f64>> = values.iter().map(|&v| vec![v]).collect();
        let mut s = Scaler::new();
        s.partial_fit(&rows).unwrap();
        s
    }

    #[test]
    fn test_lookup() {
        let mut set = ScalerSet::new();
        set.insert_global("mcep", fitted(&[1.0, 3.0])).unwrap();
        set.insert_speaker("SF1", "lcf0", fitted(&[5.0, 5.5])).unwrap();
        set.insert_speaker("SF1", "cenergy", fitted(&[-1.0])).unwrap();

        assert_eq!(set.global("mcep").unwrap().mean, vec![2.0]);
        assert!(set.global("SF1").is_none());
        assert_eq!(set.speaker("SF1", "lcf0").unwrap().n_samples_seen, 2);
        assert!(set.speaker("SF1", "mcep").is_none());
        assert!(set.speaker("mcep", "lcf0").is_none());
        assert_eq!(set.features(), vec!["mcep"]);
        assert_eq!(set.speakers(), vec!["SF1"]);
    }

    #[test]
    fn test_name_collisions() {
        let mut set = ScalerSet::new();
        set.insert_global("lcf0", fitted(&[1.0])).unwrap();
        assert!(set.insert_speaker("lcf0", "cenergy", fitted(&[1.0])).is_err());

        set.insert_speaker("TM1", "lcf0", fitted(&[1.0])).unwrap();
        assert!(set.insert_global("TM1", fitted(&[1.0])).is_err());
    }

    #[test]
    fn test_json_layout_and_reload() {
        let mut set = ScalerSet::new();
        set.insert_global("mlfb", fitted(&[0.0, 2.0])).unwrap();
        set.insert_speaker("SF1", "lcf0", fitted(&[4.0, 6.0])).unwrap();

        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["mlfb"]["n_samples_seen"], 2);
        assert_eq!(value["SF1"]["lcf0"]["mean"][0], 5.0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scaler.json");
        set.save(&path).unwrap();
        assert_eq!(ScalerSet::load(&path).unwrap(), set);
    }
}
