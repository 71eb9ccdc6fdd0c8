//! Local staging area for downloaded metadata and resource payloads.
//!
//! Layout below the working directory:
//!
//! ```text
//! org_mapping.json
//! organizations/{org_id}.json
//! datasets/{dataset_id}/dataset.json
//! datasets/{dataset_id}/resources/{resource_id}.{format}
//! ```
//!
//! Nothing is cleaned up after a run.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::mapping::MAPPING_FILE;

const ORGANIZATIONS_DIR: &str = "organizations";
const DATASETS_DIR: &str = "datasets";
const RESOURCES_DIR: &str = "resources";
const DATASET_FILE: &str = "dataset.json";

/// Extension used when a resource declares no format.
pub const DEFAULT_EXTENSION: &str = "bin";

/// Directory tree that holds everything a run downloads.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Opens the staging area, creating the top-level directories.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let area = Self { root: root.into() };
        fs::create_dir_all(area.root.join(ORGANIZATIONS_DIR))?;
        fs::create_dir_all(area.root.join(DATASETS_DIR))?;
        Ok(area)
    }

    /// Working directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the organization mapping.
    #[must_use]
    pub fn mapping_path(&self) -> PathBuf {
        self.root.join(MAPPING_FILE)
    }

    /// Staged metadata of one organization.
    #[must_use]
    pub fn organization_file(&self, org_id: &str) -> PathBuf {
        self.root
            .join(ORGANIZATIONS_DIR)
            .join(format!("{}.json", file_component(org_id)))
    }

    /// Per-dataset directory.
    #[must_use]
    pub fn dataset_dir(&self, dataset_id: &str) -> PathBuf {
        self.root.join(DATASETS_DIR).join(file_component(dataset_id))
    }

    /// Staged metadata of one dataset.
    #[must_use]
    pub fn dataset_file(&self, dataset_id: &str) -> PathBuf {
        self.dataset_dir(dataset_id).join(DATASET_FILE)
    }

    /// Staged payload of one resource.
    #[must_use]
    pub fn resource_file(&self, dataset_id: &str, resource_id: &str, format: Option<&str>) -> PathBuf {
        self.dataset_dir(dataset_id).join(RESOURCES_DIR).join(format!(
            "{}.{}",
            file_component(resource_id),
            staged_extension(format)
        ))
    }

    /// Writes pretty-printed JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error on serialization or IO failure.
    pub fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        ensure_parent(path)?;
        fs::write(path, serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    /// Creates the parent directories of a file about to be streamed in.
    ///
    /// # Errors
    ///
    /// Returns an error on IO failure.
    pub fn prepare_file(&self, path: &Path) -> Result<()> {
        ensure_parent(path)
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Lowercased declared format, or [`DEFAULT_EXTENSION`] when absent.
#[must_use]
pub fn staged_extension(format: Option<&str>) -> String {
    match format.map(str::trim) {
        Some(f) if !f.is_empty() => file_component(&f.to_lowercase()),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// Keeps identifiers from escaping their directory.
fn file_component(value: &str) -> String {
    match value {
        "" | "." | ".." => value.replace('.', "_") + "_",
        _ => value.replace(['/', '\\'], "_"),
    }
}
