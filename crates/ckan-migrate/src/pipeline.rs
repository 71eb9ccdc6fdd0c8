//! Migration pipeline orchestration.

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::MigrationConfig;
use crate::error::Result;
use crate::migrate::{DatasetMigrator, DatasetSelection, MigrationContext, OrganizationMigrator};
use crate::model::{DatasetOutcome, Reconciliation};

/// Oldest target catalog release the payloads are written for.
pub const MIN_TARGET_VERSION: (u32, u32) = (2, 11);

/// Operator steps the tool does not perform, shown after every run.
pub const POST_MIGRATION_STEPS: [&str; 3] = [
    "Run 'ckan -c /etc/ckan/default/ckan.ini search-index rebuild' on the target system",
    "Check if datapusher/datastore requires configuration",
    "Verify permissions and user roles",
];

/// What a run migrates.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    /// Run the organization phase.
    pub migrate_organizations: bool,
    /// Run the dataset phase.
    pub migrate_datasets: bool,
    /// Upload resources during the dataset phase.
    pub migrate_resources: bool,
    /// Organization names or ids to restrict to.
    pub organizations: Vec<String>,
    /// Dataset names or ids to restrict to.
    pub datasets: Vec<String>,
}

impl Default for MigrationPlan {
    fn default() -> Self {
        Self {
            migrate_organizations: true,
            migrate_datasets: true,
            migrate_resources: true,
            organizations: Vec::new(),
            datasets: Vec::new(),
        }
    }
}

impl MigrationPlan {
    /// Names of the components this plan migrates, in phase order.
    #[must_use]
    pub fn components(&self) -> Vec<&'static str> {
        let mut components = Vec::new();
        if self.migrate_organizations {
            components.push("organizations");
        }
        if self.migrate_datasets {
            components.push("datasets");
            if self.migrate_resources {
                components.push("resources");
            }
        }
        components
    }
}

/// Pacing and display options.
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    /// Pause after each organization and each dataset.
    pub item_delay: Duration,
    /// Draw progress bars.
    pub show_progress: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_secs(1),
            show_progress: true,
        }
    }
}

/// Tally for the organization or dataset phase.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PhaseStats {
    /// Items listed for the phase.
    pub total: u64,
    /// Newly created on the target.
    pub created: u64,
    /// Found on the target and reused.
    pub reused: u64,
    /// Not downloaded, or neither found nor created.
    pub failed: u64,
}

impl PhaseStats {
    fn record(&mut self, reconciliation: &Reconciliation) {
        match reconciliation {
            Reconciliation::Created(_) => self.created += 1,
            Reconciliation::Reused(_) => self.reused += 1,
            Reconciliation::Failed(_) => self.failed += 1,
        }
    }

    /// Created or reused.
    #[must_use]
    pub fn succeeded(&self) -> u64 {
        self.created + self.reused
    }
}

/// Tally for resource uploads across all datasets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResourceStats {
    /// Uploads attempted.
    pub total: u64,
    /// Uploaded with their payload.
    pub uploaded: u64,
    /// Created through the minimal fallback only.
    pub placeholder: u64,
    /// Not created.
    pub failed: u64,
}

impl ResourceStats {
    fn record(&mut self, outcome: &DatasetOutcome) {
        let total = outcome.resources_total as u64;
        let succeeded = outcome.resources_succeeded as u64;
        let placeholder = outcome.resources_placeholder as u64;
        self.total += total;
        self.uploaded += succeeded - placeholder;
        self.placeholder += placeholder;
        self.failed += total - succeeded;
    }
}

/// Migration statistics.
#[derive(Debug, Default, Clone)]
pub struct MigrationStats {
    /// Organization phase, if it ran.
    pub organizations: Option<PhaseStats>,
    /// Dataset phase, if it ran.
    pub datasets: Option<PhaseStats>,
    /// Resource uploads inside the dataset phase.
    pub resources: ResourceStats,
    /// Duration in seconds.
    pub duration_secs: f64,
}

/// Migration pipeline.
pub struct Pipeline {
    ctx: MigrationContext,
    plan: MigrationPlan,
    options: MigrationOptions,
}

impl Pipeline {
    /// Create a new migration pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the clients or the staging area cannot be set up.
    pub fn new(config: &MigrationConfig, plan: MigrationPlan) -> Result<Self> {
        let ctx = MigrationContext::from_config(config)?;
        let options = MigrationOptions {
            item_delay: config.item_delay(),
            ..MigrationOptions::default()
        };
        Ok(Self::with_context(ctx, plan, options))
    }

    /// Pipeline over an already-built context.
    pub fn with_context(ctx: MigrationContext, plan: MigrationPlan, options: MigrationOptions) -> Self {
        Self { ctx, plan, options }
    }

    /// Run context, for inspection after a run.
    pub fn context(&self) -> &MigrationContext {
        &self.ctx
    }

    /// Run the migration pipeline.
    ///
    /// Item failures never abort the run; they are tallied in the returned
    /// statistics.
    ///
    /// # Errors
    ///
    /// Returns an error only if the target catalog fails the pre-flight
    /// check, in which case no phase runs.
    pub async fn run(&mut self) -> Result<MigrationStats> {
        let start = Instant::now();
        let mut stats = MigrationStats::default();

        self.check_target().await?;

        if self.plan.migrate_organizations {
            stats.organizations = Some(self.migrate_organizations().await);
        }

        if self.plan.migrate_datasets {
            let (datasets, resources) = self.migrate_datasets().await;
            stats.datasets = Some(datasets);
            stats.resources = resources;
        }

        stats.duration_secs = start.elapsed().as_secs_f64();
        log_summary(&stats);

        Ok(stats)
    }

    async fn check_target(&self) -> Result<()> {
        info!("Checking target CKAN instance...");
        let status = match self.ctx.target.get("status_show", &[]).await.into_result() {
            Ok(status) => status,
            Err(e) => {
                error!("Target catalog check failed: {}", e);
                return Err(e);
            }
        };
        info!("Target CKAN instance is accessible.");

        match status.get("ckan_version").and_then(|v| v.as_str()) {
            Some(version) => {
                info!("Target CKAN version: {}", version);
                match parse_version(version) {
                    Some(parsed) if parsed < MIN_TARGET_VERSION => warn!(
                        "Target CKAN version {} may not be compatible with this migration tool",
                        version
                    ),
                    Some(_) => {}
                    None => warn!("Could not parse CKAN version information"),
                }
            }
            None => warn!("Could not parse CKAN version information"),
        }

        info!("IMPORTANT: Before continuing, ensure you've run 'ckan -c CONFIG_FILE db upgrade' on the target system");
        Ok(())
    }

    async fn migrate_organizations(&mut self) -> PhaseStats {
        info!("===== MIGRATING ORGANIZATIONS =====");
        let mut stats = PhaseStats::default();
        let show_progress = self.options.show_progress;
        let item_delay = self.options.item_delay;
        let filter = self.plan.organizations.clone();

        let mut migrator = OrganizationMigrator::new(&mut self.ctx);
        let org_ids = migrator.list(&filter).await;
        if org_ids.is_empty() {
            warn!("No organizations found to migrate.");
            return stats;
        }

        stats.total = org_ids.len() as u64;
        let progress = create_progress_bar(stats.total, show_progress);

        for (i, org_id) in org_ids.iter().enumerate() {
            info!("Processing organization {}/{}: {}", i + 1, org_ids.len(), org_id);
            progress.set_message(org_id.clone());

            match migrator.download(org_id).await {
                Some(staged) => stats.record(&migrator.upload(&staged).await),
                None => stats.failed += 1,
            }

            progress.inc(1);
            pause(item_delay).await;
        }

        progress.finish_with_message("Organizations done");
        info!(
            "Organization migration complete. Successfully migrated {}/{} organizations.",
            stats.succeeded(),
            stats.total
        );
        stats
    }

    async fn migrate_datasets(&self) -> (PhaseStats, ResourceStats) {
        info!("===== MIGRATING DATASETS =====");
        let mut stats = PhaseStats::default();
        let mut resources = ResourceStats::default();
        let skip_resources = !self.plan.migrate_resources;

        let migrator = DatasetMigrator::new(&self.ctx);
        let mut dataset_ids = Vec::new();
        let mut seen = HashSet::new();
        for selection in DatasetSelection::from_filters(&self.plan.datasets, &self.plan.organizations) {
            for id in migrator.list(&selection).await {
                if seen.insert(id.clone()) {
                    dataset_ids.push(id);
                }
            }
        }

        if dataset_ids.is_empty() {
            warn!("No datasets found to migrate.");
            return (stats, resources);
        }

        stats.total = dataset_ids.len() as u64;
        let progress = create_progress_bar(stats.total, self.options.show_progress);

        for (i, dataset_id) in dataset_ids.iter().enumerate() {
            info!("Processing dataset {}/{}: {}", i + 1, dataset_ids.len(), dataset_id);
            progress.set_message(dataset_id.clone());

            match migrator.download(dataset_id).await {
                Some(staged) => {
                    let outcome = migrator.migrate(&staged, skip_resources).await;
                    stats.record(&outcome.reconciliation);
                    resources.record(&outcome);
                }
                None => stats.failed += 1,
            }

            progress.inc(1);
            pause(self.options.item_delay).await;
        }

        progress.finish_with_message("Datasets done");
        info!(
            "Dataset migration complete. Successfully migrated {}/{} datasets.",
            stats.succeeded(),
            stats.total
        );
        (stats, resources)
    }
}

/// `major.minor` prefix of a version string.
fn parse_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
}

fn log_summary(stats: &MigrationStats) {
    info!("===== MIGRATION SUMMARY =====");
    if let Some(orgs) = &stats.organizations {
        info!(
            "Organizations: {}/{} migrated successfully ({} created, {} reused, {} failed)",
            orgs.succeeded(),
            orgs.total,
            orgs.created,
            orgs.reused,
            orgs.failed
        );
    }
    if let Some(datasets) = &stats.datasets {
        info!(
            "Datasets: {}/{} migrated successfully ({} created, {} reused, {} failed)",
            datasets.succeeded(),
            datasets.total,
            datasets.created,
            datasets.reused,
            datasets.failed
        );
        let res = &stats.resources;
        if res.total > 0 {
            info!(
                "Resources: {} uploaded, {} placeholders, {} failed of {}",
                res.uploaded, res.placeholder, res.failed, res.total
            );
        }
    }
    info!("Finished in {:.1}s", stats.duration_secs);

    info!("===== POST-MIGRATION STEPS =====");
    for (i, step) in POST_MIGRATION_STEPS.iter().enumerate() {
        info!("{}. {}", i + 1, step);
    }
}

fn create_progress_bar(total: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    pb
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
