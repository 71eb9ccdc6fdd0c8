//! Organization listing, staging and reconciliation.

use tracing::{error, info};

use crate::migrate::context::MigrationContext;
use crate::model::{result_id, string_list, Reconciliation, SourceOrganization};
use crate::sanitize::sanitize_name;

/// Organization downloaded from the source and written to staging.
#[derive(Debug, Clone)]
pub struct StagedOrganization {
    /// Parsed source record.
    pub metadata: SourceOrganization,
}

/// Migrates organizations and maintains the id mapping.
pub struct OrganizationMigrator<'a> {
    ctx: &'a mut MigrationContext,
}

impl<'a> OrganizationMigrator<'a> {
    /// Creates a migrator over the run context.
    pub fn new(ctx: &'a mut MigrationContext) -> Self {
        Self { ctx }
    }

    /// Lists source organization ids, optionally restricted to `filter`.
    ///
    /// Filter entries are matched against ids first. Entries that match no
    /// id are then matched against names, fetching each remaining
    /// organization until every entry is resolved or the list runs out.
    pub async fn list(&self, filter: &[String]) -> Vec<String> {
        info!("Retrieving list of organizations...");
        let response = self.ctx.source.get("organization_list", &[]).await;
        if !response.success {
            error!(
                "Failed to get organization list: {}",
                response.error_message()
            );
            return Vec::new();
        }

        let all_ids = string_list(&response.result);
        info!("Found {} organizations in total", all_ids.len());

        if filter.is_empty() {
            return all_ids;
        }

        let mut selected: Vec<String> = Vec::new();
        for entry in filter {
            if all_ids.contains(entry) && !selected.contains(entry) {
                selected.push(entry.clone());
            }
        }

        let mut unmatched: Vec<&String> = filter
            .iter()
            .filter(|f| !selected.contains(*f))
            .collect();
        for org_id in &all_ids {
            if unmatched.is_empty() {
                break;
            }
            if selected.contains(org_id) {
                continue;
            }

            let shown = self
                .ctx
                .source
                .get("organization_show", &[("id", org_id.as_str())])
                .await;
            if !shown.success {
                continue;
            }
            let name = shown.result.get("name").and_then(|n| n.as_str());
            if let Some(pos) = unmatched.iter().position(|f| Some(f.as_str()) == name) {
                unmatched.remove(pos);
                selected.push(org_id.clone());
            }
        }

        info!("Filtered to {} specified organizations", selected.len());
        selected
    }

    /// Fetches one organization and writes it to staging.
    ///
    /// Returns `None` (after logging) if the fetch, the write or parsing fails.
    pub async fn download(&self, org_id: &str) -> Option<StagedOrganization> {
        info!("Downloading organization: {}", org_id);
        let response = self
            .ctx
            .source
            .get(
                "organization_show",
                &[("id", org_id), ("include_datasets", "false")],
            )
            .await;

        if !response.success {
            error!(
                "Failed to get organization {}: {}",
                org_id,
                response.error_message()
            );
            return None;
        }

        let metadata_file = self.ctx.staging.organization_file(org_id);
        if let Err(e) = self.ctx.staging.write_json(&metadata_file, &response.result) {
            error!("Failed to stage organization {}: {}", org_id, e);
            return None;
        }

        match serde_json::from_value::<SourceOrganization>(response.result) {
            Ok(metadata) => Some(StagedOrganization { metadata }),
            Err(e) => {
                error!("Unreadable organization record {}: {}", org_id, e);
                None
            }
        }
    }

    /// Creates the organization on the target unless it is already there.
    ///
    /// Already-mapped organizations are skipped without any request. A
    /// target organization with the sanitized name counts as migrated and
    /// its id is recorded.
    pub async fn upload(&mut self, staged: &StagedOrganization) -> Reconciliation {
        let org = &staged.metadata;
        let label = org.name.as_deref().unwrap_or(&org.id);

        if let Some(target_id) = self.ctx.mapping.get(&org.id) {
            info!("Organization {} already migrated, skipping", label);
            return Reconciliation::Reused(target_id.to_string());
        }

        info!("Processing organization: {}", label);

        let name = org.name.as_deref().map(|original| {
            let sanitized = sanitize_name(original);
            if sanitized != original {
                info!(
                    "Organization name sanitized: '{}' -> '{}'",
                    original, sanitized
                );
            }
            sanitized
        });

        if let Some(name) = name.as_deref() {
            let existing = self.ctx.target.get("organization_show", &[("id", name)]).await;
            if existing.success {
                return match result_id(&existing.result) {
                    Some(target_id) => {
                        info!("Organization already exists with ID: {}", target_id);
                        self.ctx.mapping.insert(org.id.clone(), target_id.clone());
                        Reconciliation::Reused(target_id)
                    }
                    None => {
                        error!("Existing organization {} reported no id", name);
                        Reconciliation::Failed("existing organization has no id".to_string())
                    }
                };
            }
        }

        let payload = org.creation_payload(name);
        let created = self.ctx.target.post("organization_create", &payload).await;
        if !created.success {
            let reason = created.error_message();
            error!("Failed to create organization {}: {}", label, reason);
            return Reconciliation::Failed(reason);
        }

        match result_id(&created.result) {
            Some(target_id) => {
                info!("Created organization with ID: {}", target_id);
                self.ctx.mapping.insert(org.id.clone(), target_id.clone());
                Reconciliation::Created(target_id)
            }
            None => {
                error!("Created organization {} but the response carried no id", label);
                Reconciliation::Failed("create response has no id".to_string())
            }
        }
    }
}

#[cfg(test)]
#[path = "organizations_tests.rs"]
mod tests;
