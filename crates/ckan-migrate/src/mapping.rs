//! Durable source-to-target organization id mapping.
//!
//! The mapping is the only state that survives between runs. It is held
//! in memory and rewritten wholesale after every insertion, so an
//! interrupted run keeps everything resolved up to the last organization.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::error::Result;

/// File name of the mapping inside the working directory.
pub const MAPPING_FILE: &str = "org_mapping.json";

/// Source organization id → target organization id.
#[derive(Debug, Clone)]
pub struct OrgMapping {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl OrgMapping {
    /// Empty mapping persisted at `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Loads the mapping stored at `path`.
    ///
    /// A missing file starts an empty mapping. An unreadable or corrupt
    /// file is logged and also starts an empty mapping.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !path.exists() {
            return Self::empty(path);
        }

        match read_entries(&path) {
            Ok(entries) => {
                info!("Loaded organization mapping with {} entries", entries.len());
                Self { path, entries }
            }
            Err(e) => {
                error!("Error loading organization mapping from {:?}: {}", path, e);
                Self::empty(path)
            }
        }
    }

    /// Writes the whole mapping. Failures are logged, not returned.
    pub fn save(&self) {
        match self.write_entries() {
            Ok(()) => info!(
                "Saved organization mapping with {} entries",
                self.entries.len()
            ),
            Err(e) => error!("Error saving organization mapping to {:?}: {}", self.path, e),
        }
    }

    fn write_entries(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Records a resolution and persists the mapping.
    pub fn insert(&mut self, source_id: impl Into<String>, target_id: impl Into<String>) {
        self.entries.insert(source_id.into(), target_id.into());
        self.save();
    }

    /// Target id for a source organization.
    #[must_use]
    pub fn get(&self, source_id: &str) -> Option<&str> {
        self.entries.get(source_id).map(String::as_str)
    }

    /// Whether a source organization has already been resolved.
    #[must_use]
    pub fn contains(&self, source_id: &str) -> bool {
        self.entries.contains_key(source_id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mapping = OrgMapping::load(dir.path().join(MAPPING_FILE));
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MAPPING_FILE);
        std::fs::write(&path, "{not json").unwrap();

        let mapping = OrgMapping::load(&path);
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_insert_persists_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MAPPING_FILE);

        let mut mapping = OrgMapping::load(&path);
        mapping.insert("org-1", "org-1-target");
        mapping.insert("org-2", "org-2-target");

        let reloaded = OrgMapping::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("org-1"), Some("org-1-target"));
        assert!(reloaded.contains("org-2"));
    }

    #[test]
    fn test_insert_overwrites_existing_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut mapping = OrgMapping::load(dir.path().join(MAPPING_FILE));
        mapping.insert("org-1", "a");
        mapping.insert("org-1", "b");
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("org-1"), Some("b"));
    }

    #[test]
    fn test_save_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join(MAPPING_FILE);
        let mut mapping = OrgMapping::empty(&path);

        mapping.insert("org-1", "t");

        assert_eq!(mapping.get("org-1"), Some("t"));
        assert!(!path.exists());
    }
}
