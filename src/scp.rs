//! Speaker/utterance index files
//!
//! An scp file holds one `key value...` entry per line. A phase directory
//! contains `spk2utt` (speaker followed by its utterance IDs) and optionally
//! `wav.scp`; feature locations come from a separate `feats.scp`.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Ordered `key -> values` entries of an scp file
#[derive(Debug, Clone, Default)]
pub struct ScpTable {
    keys: Vec<String>,
    entries: HashMap<String, Vec<String>>,
}

impl ScpTable {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in file order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(|v| v.as_slice())
    }

    /// First value of `key`
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.first()).map(|s| s.as_str())
    }
}

/// Parse an scp file
pub fn read_scp<P: AsRef<Path>>(path: P) -> Result<ScpTable> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scp file: {}", path.display()))?;
    parse_scp(&contents).with_context(|| format!("Malformed scp file: {}", path.display()))
}

fn parse_scp(contents: &str) -> Result<ScpTable> {
    let mut table = ScpTable::default();
    for (lineno, line) in contents.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let Some(key) = fields.next() else {
            continue;
        };
        let values: Vec<String> = fields.map(str::to_string).collect();
        if values.is_empty() {
            bail!("line {}: entry '{}' has no value", lineno + 1, key);
        }
        if table.entries.insert(key.to_string(), values).is_some() {
            bail!("line {}: duplicate key '{}'", lineno + 1, key);
        }
        table.keys.push(key.to_string());
    }
    Ok(table)
}

/// Utterance ID to feature file mapping
#[derive(Debug, Clone, Default)]
pub struct FeatsScp {
    table: ScpTable,
}

impl FeatsScp {
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn get(&self, utt: &str) -> Option<PathBuf> {
        self.table.first(utt).map(PathBuf::from)
    }

    /// All feature files in file order
    pub fn files(&self) -> Vec<PathBuf> {
        self.table
            .keys()
            .iter()
            .filter_map(|utt| self.get(utt))
            .collect()
    }
}

/// Load a `feats.scp` file
pub fn open_featsscp<P: AsRef<Path>>(path: P) -> Result<FeatsScp> {
    Ok(FeatsScp {
        table: read_scp(path)?,
    })
}

/// Index files of one phase (train, dev, eval, ...)
#[derive(Debug, Clone)]
pub struct ScpDir {
    spk2utt: ScpTable,
    wav: Option<ScpTable>,
}

impl ScpDir {
    /// Read `spk2utt` and, when present, `wav.scp` from `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let spk2utt = read_scp(dir.join("spk2utt"))?;
        let wav_path = dir.join("wav.scp");
        let wav = if wav_path.exists() {
            Some(read_scp(wav_path)?)
        } else {
            None
        };
        tracing::debug!(
            "Opened scp dir {}: {} speakers",
            dir.display(),
            spk2utt.len()
        );
        Ok(Self { spk2utt, wav })
    }

    /// Speakers in `spk2utt` order
    pub fn speakers(&self) -> &[String] {
        self.spk2utt.keys()
    }

    pub fn utterances(&self, spkr: &str) -> Option<&[String]> {
        self.spk2utt.get(spkr)
    }

    /// Speaker of each utterance
    pub fn utt2spk(&self) -> HashMap<&str, &str> {
        self.speakers()
            .iter()
            .flat_map(|spkr| {
                self.spk2utt
                    .get(spkr)
                    .unwrap_or_default()
                    .iter()
                    .map(move |utt| (utt.as_str(), spkr.as_str()))
            })
            .collect()
    }

    pub fn wav(&self, utt: &str) -> Option<PathBuf> {
        self.wav.as_ref()?.first(utt).map(PathBuf::from)
    }

    /// Feature files of every utterance of `spkr`
    pub fn feature_files(&self, feats: &FeatsScp, spkr: &str) -> Result<Vec<PathBuf>> {
        let utts = self
            .utterances(spkr)
            .with_context(|| format!("Unknown speaker: {}", spkr))?;
        utts.iter()
            .map(|utt| {
                feats
                    .get(utt)
                    .with_context(|| format!("No feature file for utterance {} ({})", utt, spkr))
            })
            .collect()
    }
}

/// Open `<scpdir>/<phase>`
pub fn open_scpdir<P: AsRef<Path>>(scpdir: P, phase: &str) -> Result<ScpDir> {
    ScpDir::open(scpdir.as_ref().join(phase))
}
