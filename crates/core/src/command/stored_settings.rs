use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matching::domain::fingerprint::Fingerprint;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Persisted pipeline state: the enabled flag and the reference
/// fingerprints.
///
/// Read once at startup, written on toggle and reference replacement.
/// Treated as eventually-consistent external state; a missing or corrupt
/// file falls back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoredSettings {
    pub enabled: bool,
    #[serde(default)]
    pub reference_fingerprints: Vec<Fingerprint>,
}

impl StoredSettings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FeedVeil").join("settings.json"))
    }

    /// Reads from the platform config directory. Embedding hosts use
    /// this pair; harnesses pass an explicit path instead.
    pub fn load() -> Self {
        Self::default_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::default_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(SettingsError::Serialize)?;
        fs::write(path, json).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = StoredSettings {
            enabled: true,
            reference_fingerprints: vec![Fingerprint::Embedding {
                vector: vec![0.25, -0.5],
                bounding_box: BoundingBox::new(1.0, 2.0, 30.0, 40.0),
            }],
        };
        settings.save_to(&path).unwrap();
        assert_eq!(StoredSettings::load_from(&path), settings);
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = StoredSettings::load_from(&dir.path().join("nope.json"));
        assert_eq!(loaded, StoredSettings::default());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(StoredSettings::load_from(&path), StoredSettings::default());
    }
}
