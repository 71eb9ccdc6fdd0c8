//! Per-run migration context.

use crate::client::{CkanClient, Side};
use crate::config::MigrationConfig;
use crate::error::Result;
use crate::mapping::OrgMapping;
use crate::staging::StagingArea;

/// Everything the migrators share during one run.
///
/// Built once from the configuration and handed to each migrator; the
/// organization migrator writes the mapping, the dataset migrator reads it.
#[derive(Debug)]
pub struct MigrationContext {
    /// Client for the catalog being migrated from.
    pub source: CkanClient,
    /// Client for the catalog being migrated to.
    pub target: CkanClient,
    /// Source → target organization ids.
    pub mapping: OrgMapping,
    /// Local copies of everything downloaded.
    pub staging: StagingArea,
}

impl MigrationContext {
    /// Builds clients and staging area and loads the organization mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built or the staging
    /// directories cannot be created.
    pub fn from_config(config: &MigrationConfig) -> Result<Self> {
        let retry = config.retry_config();
        let source = CkanClient::new(
            Side::Source,
            &config.source_url,
            &config.source_api_key,
            config.timeout(),
            retry.clone(),
        )?;
        let target = CkanClient::new(
            Side::Target,
            &config.target_url,
            &config.target_api_key,
            config.timeout(),
            retry,
        )?;
        let staging = StagingArea::create(&config.work_dir)?;
        Ok(Self::new(source, target, staging))
    }

    /// Assembles a context, loading the mapping from the staging area.
    pub fn new(source: CkanClient, target: CkanClient, staging: StagingArea) -> Self {
        let mapping = OrgMapping::load(staging.mapping_path());
        Self {
            source,
            target,
            mapping,
            staging,
        }
    }
}
