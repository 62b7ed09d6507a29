//! Learned offset persistence using TOML format

use crate::error::{AvOffsetError, Result};
use crate::offset::AudioOffset;
use crate::stream::Signature;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// On-disk layout: serialized signature to offset in ms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LearnedDocument {
    #[serde(default)]
    offsets: BTreeMap<String, i64>,
}

/// Location of the persisted learned-offset table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnedFile {
    path: PathBuf,
}

impl LearnedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Platform default, e.g. `~/.local/share/avoffset/learned.toml`
    pub fn default_location() -> Self {
        Self::new(
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("avoffset")
                .join("learned.toml"),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load learned offsets, returns an empty table if the file doesn't exist
    ///
    /// Unreadable files and malformed keys are logged and skipped.
    pub fn load(&self) -> BTreeMap<Signature, AudioOffset> {
        if !self.path.exists() {
            debug!("Learned offsets file not found, starting empty");
            return BTreeMap::new();
        }

        let document: LearnedDocument = match fs::read_to_string(&self.path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(document) => document,
                Err(e) => {
                    warn!("Failed to parse learned offsets file: {}", e);
                    return BTreeMap::new();
                }
            },
            Err(e) => {
                warn!("Failed to read learned offsets file: {}", e);
                return BTreeMap::new();
            }
        };

        let mut learned = BTreeMap::new();
        for (key, ms) in document.offsets {
            match key.parse::<Signature>() {
                Ok(sig) => {
                    learned.insert(sig, AudioOffset::from_millis(ms));
                }
                Err(e) => warn!("Skipping learned offset '{}': {}", key, e),
            }
        }

        info!(
            "Loaded {} learned offsets from {:?}",
            learned.len(),
            self.path
        );
        learned
    }

    /// Save learned offsets to file
    pub fn save(&self, learned: &BTreeMap<Signature, AudioOffset>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| AvOffsetError::persistence(parent, e))?;
        }

        let document = LearnedDocument {
            offsets: learned
                .iter()
                .map(|(sig, offset)| (sig.key(), offset.as_millis()))
                .collect(),
        };
        let content = toml::to_string_pretty(&document)
            .map_err(|e| AvOffsetError::persistence(&self.path, e))?;

        fs::write(&self.path, content).map_err(|e| AvOffsetError::persistence(&self.path, e))?;
        debug!("Saved {} learned offsets to {:?}", learned.len(), self.path);
        Ok(())
    }

    /// Delete the file; a missing file is not an error
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed learned offsets file {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AvOffsetError::persistence(&self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{AudioFormat, FpsAxis, FpsBucket, HdrType};

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = LearnedFile::new(dir.path().join("nested").join("learned.toml"));

        let mut learned = BTreeMap::new();
        let sig = Signature::new(
            HdrType::Hdr10,
            AudioFormat::Dd,
            FpsAxis::Bucket(FpsBucket::Fps24),
        );
        learned.insert(sig, AudioOffset::from_millis(80));
        file.save(&learned).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("hdr10_24_ac3"));
        assert_eq!(file.load(), learned);
    }

    #[test]
    fn test_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = LearnedFile::new(dir.path().join("learned.toml"));
        assert!(file.load().is_empty());
        assert!(file.remove().is_ok());

        fs::write(file.path(), "offsets = [not toml").unwrap();
        assert!(file.load().is_empty());
    }

    #[test]
    fn test_bad_keys_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let file = LearnedFile::new(dir.path().join("learned.toml"));
        fs::write(
            file.path(),
            "[offsets]\n\"sdr_25_ac3\" = -20\n\"bogus\" = 5\n",
        )
        .unwrap();

        let learned = file.load();
        assert_eq!(learned.len(), 1);
        let sig: Signature = "sdr_25_ac3".parse().unwrap();
        assert_eq!(learned.get(&sig), Some(&AudioOffset::from_millis(-20)));
    }
}
