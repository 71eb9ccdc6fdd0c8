//! Dataset listing, staging and reconciliation.

use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::migrate::context::MigrationContext;
use crate::migrate::resources::ResourceMigrator;
use crate::model::{
    result_id, string_list, DatasetOutcome, Reconciliation, ResourceOutcome, SourceDataset,
    SourceResource,
};
use crate::sanitize::sanitize_name;

/// Which datasets a run lists. Exactly one mode applies per listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSelection {
    /// Named ids or names, each checked on the source.
    Explicit(Vec<String>),
    /// Datasets owned by one organization (id or name).
    Organization(String),
    /// Every dataset on the source.
    All,
}

impl DatasetSelection {
    /// Selections for a run: explicit datasets win over organizations,
    /// which win over the full catalog. Organizations yield one selection
    /// each.
    #[must_use]
    pub fn from_filters(datasets: &[String], organizations: &[String]) -> Vec<Self> {
        if !datasets.is_empty() {
            vec![Self::Explicit(datasets.to_vec())]
        } else if !organizations.is_empty() {
            organizations
                .iter()
                .map(|org| Self::Organization(org.clone()))
                .collect()
        } else {
            vec![Self::All]
        }
    }
}

/// Resource payload downloaded to staging.
#[derive(Debug, Clone)]
pub struct StagedResource {
    /// Source descriptor.
    pub descriptor: SourceResource,
    /// Local payload file.
    pub path: PathBuf,
}

/// Dataset downloaded from the source, with the resources that made it.
#[derive(Debug, Clone)]
pub struct StagedDataset {
    /// Parsed source record.
    pub metadata: SourceDataset,
    /// Successfully downloaded resources, in source order.
    pub resources: Vec<StagedResource>,
}

/// Migrates datasets, remapping organizations through the mapping.
pub struct DatasetMigrator<'a> {
    ctx: &'a MigrationContext,
}

impl<'a> DatasetMigrator<'a> {
    /// Creates a migrator over the run context.
    pub fn new(ctx: &'a MigrationContext) -> Self {
        Self { ctx }
    }

    /// Lists source dataset ids for one selection mode.
    pub async fn list(&self, selection: &DatasetSelection) -> Vec<String> {
        match selection {
            DatasetSelection::Explicit(wanted) => {
                let mut ids = Vec::new();
                for id in wanted {
                    let shown = self
                        .ctx
                        .source
                        .get("package_show", &[("id", id.as_str())])
                        .await;
                    if shown.success {
                        ids.push(id.clone());
                    } else {
                        warn!("Dataset {} not found on source, skipping", id);
                    }
                }
                info!("Found {} specified datasets by ID", ids.len());
                ids
            }
            DatasetSelection::Organization(org) => {
                let response = self
                    .ctx
                    .source
                    .get(
                        "organization_show",
                        &[("id", org.as_str()), ("include_datasets", "true")],
                    )
                    .await;
                if !response.success {
                    error!(
                        "Failed to get datasets for organization {}: {}",
                        org,
                        response.error_message()
                    );
                    return Vec::new();
                }
                let ids: Vec<String> = response
                    .result
                    .get("packages")
                    .and_then(|p| p.as_array())
                    .map(|packages| packages.iter().filter_map(result_id).collect())
                    .unwrap_or_default();
                info!("Found {} datasets in organization {}", ids.len(), org);
                ids
            }
            DatasetSelection::All => {
                let response = self.ctx.source.get("package_list", &[]).await;
                if !response.success {
                    error!("Failed to get dataset list: {}", response.error_message());
                    return Vec::new();
                }
                let ids = string_list(&response.result);
                info!("Found {} datasets in total", ids.len());
                ids
            }
        }
    }

    /// Fetches a dataset, stages its metadata and downloads its resources.
    ///
    /// Resources without a URL are skipped. A resource whose download or
    /// write fails is logged and left out; the dataset still stages.
    pub async fn download(&self, dataset_id: &str) -> Option<StagedDataset> {
        info!("Downloading dataset: {}", dataset_id);
        let response = self
            .ctx
            .source
            .get("package_show", &[("id", dataset_id)])
            .await;
        if !response.success {
            error!(
                "Failed to get dataset {}: {}",
                dataset_id,
                response.error_message()
            );
            return None;
        }

        let staging = &self.ctx.staging;
        let metadata_file = staging.dataset_file(dataset_id);
        if let Err(e) = staging.write_json(&metadata_file, &response.result) {
            error!("Failed to stage dataset {}: {}", dataset_id, e);
            return None;
        }

        let metadata: SourceDataset = match serde_json::from_value(response.result) {
            Ok(metadata) => metadata,
            Err(e) => {
                error!("Unreadable dataset record {}: {}", dataset_id, e);
                return None;
            }
        };

        let mut resources = Vec::new();
        for descriptor in metadata.resources() {
            let Some(url) = descriptor.download_url() else {
                continue;
            };
            info!("  Downloading resource: {}", descriptor.id);

            let path =
                staging.resource_file(dataset_id, &descriptor.id, descriptor.format.as_deref());
            let staged = match staging.prepare_file(&path) {
                Ok(()) => self.ctx.source.download_to(url, &path).await,
                Err(e) => Err(e),
            };
            match staged {
                Ok(_) => {
                    info!("  Resource saved to {}", path.display());
                    resources.push(StagedResource {
                        descriptor: descriptor.clone(),
                        path,
                    });
                }
                Err(e) => error!("  Failed to download resource {}: {}", descriptor.id, e),
            }
        }

        Some(StagedDataset {
            metadata,
            resources,
        })
    }

    /// Reconciles the dataset with the target, then uploads its resources.
    ///
    /// Resources are uploaded whether the dataset was created or reused.
    /// Resource failures are counted but never fail the dataset.
    pub async fn migrate(&self, staged: &StagedDataset, skip_resources: bool) -> DatasetOutcome {
        let dataset = &staged.metadata;
        let label = dataset.name.as_deref().unwrap_or(&dataset.id);
        info!("Migrating dataset: {}", label);

        let reconciliation = self.reconcile(dataset).await;
        let target_id = reconciliation.target_id().map(String::from);
        let mut outcome = DatasetOutcome {
            reconciliation,
            resources_succeeded: 0,
            resources_total: 0,
            resources_placeholder: 0,
        };
        let Some(target_id) = target_id else {
            return outcome;
        };
        if skip_resources || staged.resources.is_empty() {
            return outcome;
        }

        let uploader = ResourceMigrator::new(&self.ctx.target);
        for resource in &staged.resources {
            outcome.resources_total += 1;
            match uploader.migrate(&target_id, resource).await {
                ResourceOutcome::Uploaded => outcome.resources_succeeded += 1,
                ResourceOutcome::Placeholder => {
                    outcome.resources_succeeded += 1;
                    outcome.resources_placeholder += 1;
                }
                ResourceOutcome::Failed(_) => {}
            }
        }
        info!(
            "Uploaded {}/{} resources",
            outcome.resources_succeeded, outcome.resources_total
        );
        outcome
    }

    async fn reconcile(&self, dataset: &SourceDataset) -> Reconciliation {
        let label = dataset.name.as_deref().unwrap_or(&dataset.id);

        let name = dataset.name.as_deref().map(|original| {
            let sanitized = sanitize_name(original);
            if sanitized != original {
                info!("Dataset name sanitized: '{}' -> '{}'", original, sanitized);
            }
            sanitized
        });

        let owner_org = dataset.owner_org.as_deref().and_then(|source_org| {
            let mapped = self.ctx.mapping.get(source_org).map(String::from);
            if mapped.is_none() {
                warn!(
                    "Organization {} not found in mapping, removing owner_org",
                    source_org
                );
            }
            mapped
        });

        if let Some(name) = name.as_deref() {
            let existing = self.ctx.target.get("package_show", &[("id", name)]).await;
            if existing.success {
                return match result_id(&existing.result) {
                    Some(target_id) => {
                        info!("Dataset already exists with ID: {}", target_id);
                        info!("Skipping dataset creation, moving to resources");
                        Reconciliation::Reused(target_id)
                    }
                    None => {
                        error!("Existing dataset {} reported no id", name);
                        Reconciliation::Failed("existing dataset has no id".to_string())
                    }
                };
            }
        }

        let payload = dataset.creation_payload(name, owner_org);
        let created = self.ctx.target.post("package_create", &payload).await;
        if !created.success {
            let reason = created.error_message();
            error!("Failed to create dataset {}: {}", label, reason);
            return Reconciliation::Failed(reason);
        }

        match result_id(&created.result) {
            Some(target_id) => {
                info!("Created dataset with ID: {}", target_id);
                Reconciliation::Created(target_id)
            }
            None => {
                error!("Created dataset {} but the response carried no id", label);
                Reconciliation::Failed("create response has no id".to_string())
            }
        }
    }
}

#[cfg(test)]
#[path = "datasets_tests.rs"]
mod tests;
