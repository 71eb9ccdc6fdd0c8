//! Typed catalog records and creation payloads.
//!
//! Source records keep only the fields the migration reads. Creation
//! payloads are explicit allow-lists: anything the source server adds
//! (ids, timestamps, revision markers, counters, membership lists) is
//! never forwarded to the target.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sanitize::{truncate_chars, MAX_NAME_LEN};

/// `id` of an action result object.
#[must_use]
pub fn result_id(result: &Value) -> Option<String> {
    result
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(String::from)
}

/// String entries of an action result array (`*_list` actions).
#[must_use]
pub fn string_list(result: &Value) -> Vec<String> {
    result
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Custom key/value field on organizations and datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extra {
    /// Field name.
    pub key: String,
    /// Field value, forwarded as-is.
    #[serde(default)]
    pub value: Value,
}

/// Dataset tag. Only the name and vocabulary survive the migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag text.
    pub name: String,
    /// Controlled vocabulary the tag belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary_id: Option<String>,
}

/// Organization as returned by `organization_show` on the source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceOrganization {
    /// Source identifier.
    pub id: String,
    /// Slug name.
    #[serde(default)]
    pub name: Option<String>,
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Logo URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Custom fields.
    #[serde(default)]
    pub extras: Option<Vec<Extra>>,
}

/// Body of `organization_create`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationPayload {
    /// Sanitized slug name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Display title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Logo URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Custom fields.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<Extra>,
}

impl SourceOrganization {
    /// Creation payload carrying the (already sanitized) name.
    #[must_use]
    pub fn creation_payload(&self, name: Option<String>) -> OrganizationPayload {
        OrganizationPayload {
            name,
            title: self.title.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            extras: self.extras.clone().unwrap_or_default(),
        }
    }
}

/// Resource descriptor embedded in a source dataset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SourceResource {
    /// Source identifier.
    #[serde(default)]
    pub id: String,
    /// Download URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Declared format (CSV, JSON, ...).
    #[serde(default)]
    pub format: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// MIME type.
    #[serde(default)]
    pub mimetype: Option<String>,
}

impl SourceResource {
    /// Non-empty download URL, if any.
    #[must_use]
    pub fn download_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// Multipart fields for `resource_create` on the target.
    ///
    /// Name is truncated and a missing description becomes empty.
    #[must_use]
    pub fn upload_form(&self, package_id: &str) -> ResourceForm {
        ResourceForm {
            package_id: package_id.to_string(),
            name: self
                .name
                .as_deref()
                .map(|n| truncate_chars(n, MAX_NAME_LEN).to_string()),
            description: self.description.clone().unwrap_or_default(),
            format: self.format.clone(),
            mimetype: self.mimetype.clone(),
            url: self.url.clone(),
        }
    }
}

/// Stringified form fields sent with a resource upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceForm {
    /// Target dataset id.
    pub package_id: String,
    /// Display name, truncated to the name limit.
    pub name: Option<String>,
    /// Description, empty when the source has none.
    pub description: String,
    /// Declared format.
    pub format: Option<String>,
    /// MIME type.
    pub mimetype: Option<String>,
    /// Original source URL.
    pub url: Option<String>,
}

impl ResourceForm {
    /// Field name/value pairs, skipping absent optional fields.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("package_id", self.package_id.clone()),
            ("description", self.description.clone()),
        ];
        let optional = [
            ("name", &self.name),
            ("format", &self.format),
            ("mimetype", &self.mimetype),
            ("url", &self.url),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                fields.push((key, v.clone()));
            }
        }
        fields
    }

    /// Minimal JSON body used when the multipart endpoint answers 404.
    #[must_use]
    pub fn fallback(&self) -> ResourceFallback {
        ResourceFallback {
            package_id: self.package_id.clone(),
            name: self.name.clone().unwrap_or_else(|| "Resource".to_string()),
            url: self
                .url
                .clone()
                .unwrap_or_else(|| "http://example.com".to_string()),
        }
    }
}

/// Body of the degraded `resource_create` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceFallback {
    /// Target dataset id.
    pub package_id: String,
    /// Resource name, `Resource` when absent.
    pub name: String,
    /// Source URL, or a stand-in when absent.
    pub url: String,
}

/// Dataset as returned by `package_show` on the source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceDataset {
    /// Source identifier.
    pub id: String,
    /// Slug name.
    #[serde(default)]
    pub name: Option<String>,
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Description, in markdown.
    #[serde(default)]
    pub notes: Option<String>,
    /// Homepage of the data.
    #[serde(default)]
    pub url: Option<String>,
    /// Publisher version string.
    #[serde(default)]
    pub version: Option<String>,
    /// Author name.
    #[serde(default)]
    pub author: Option<String>,
    /// Author contact.
    #[serde(default)]
    pub author_email: Option<String>,
    /// Maintainer name.
    #[serde(default)]
    pub maintainer: Option<String>,
    /// Maintainer contact.
    #[serde(default)]
    pub maintainer_email: Option<String>,
    /// License identifier.
    #[serde(default)]
    pub license_id: Option<String>,
    /// Source id of the owning organization.
    #[serde(default)]
    pub owner_org: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
    /// Custom fields.
    #[serde(default)]
    pub extras: Option<Vec<Extra>>,
    /// Resource descriptors, in source order.
    #[serde(default)]
    pub resources: Option<Vec<SourceResource>>,
}

impl SourceDataset {
    /// Resource descriptors, in source order.
    #[must_use]
    pub fn resources(&self) -> &[SourceResource] {
        self.resources.as_deref().unwrap_or_default()
    }

    /// Creation payload with sanitized name and remapped owner.
    ///
    /// Resources are never embedded; they are created one by one.
    #[must_use]
    pub fn creation_payload(&self, name: Option<String>, owner_org: Option<String>) -> DatasetPayload {
        DatasetPayload {
            name,
            title: self.title.clone(),
            notes: self.notes.clone(),
            url: self.url.clone(),
            version: self.version.clone(),
            author: self.author.clone(),
            author_email: self.author_email.clone(),
            maintainer: self.maintainer.clone(),
            maintainer_email: self.maintainer_email.clone(),
            license_id: self.license_id.clone(),
            owner_org,
            tags: self.tags.clone().unwrap_or_default(),
            extras: self.extras.clone().unwrap_or_default(),
        }
    }
}

/// Body of `package_create`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetPayload {
    /// Sanitized slug name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Display title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Homepage of the data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Publisher version string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Author name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Author contact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    /// Maintainer name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<String>,
    /// Maintainer contact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainer_email: Option<String>,
    /// License identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,
    /// Target id of the owning organization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_org: Option<String>,
    /// Tags, name and vocabulary only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    /// Custom fields.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<Extra>,
}

/// Outcome of reconciling one organization or dataset with the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// A new entity was created with this target id.
    Created(String),
    /// The entity already existed on the target with this id.
    Reused(String),
    /// Neither found nor created.
    Failed(String),
}

impl Reconciliation {
    /// Created or reused.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// Resolved target id.
    #[must_use]
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Self::Created(id) | Self::Reused(id) => Some(id),
            Self::Failed(_) => None,
        }
    }
}

/// Outcome of one resource upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOutcome {
    /// Payload uploaded with full metadata.
    Uploaded,
    /// Only the minimal fallback record was created.
    Placeholder,
    /// Nothing was created.
    Failed(String),
}

impl ResourceOutcome {
    /// Uploaded or placeholder.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Outcome of one dataset migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetOutcome {
    /// Dataset record reconciliation.
    pub reconciliation: Reconciliation,
    /// Resources uploaded or placeholdered.
    pub resources_succeeded: usize,
    /// Resources attempted.
    pub resources_total: usize,
    /// Resources that only got a fallback record.
    pub resources_placeholder: usize,
}

impl DatasetOutcome {
    /// Failed before any resource was attempted.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            reconciliation: Reconciliation::Failed(reason.into()),
            resources_succeeded: 0,
            resources_total: 0,
            resources_placeholder: 0,
        }
    }

    /// Resource failures do not fail the dataset.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.reconciliation.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source_org_json() -> Value {
        json!({
            "id": "org-1",
            "name": "My Org!",
            "title": "My Org",
            "description": null,
            "created": "2019-01-01T00:00:00",
            "is_organization": true,
            "revision_id": "r1",
            "package_count": 12,
            "users": [{"name": "admin", "capacity": "admin"}],
            "state": "active",
            "num_followers": 3,
            "extras": [{"key": "region", "value": "north"}]
        })
    }

    #[test]
    fn test_organization_payload_is_allow_list() {
        let org: SourceOrganization = serde_json::from_value(source_org_json()).unwrap();
        let payload = serde_json::to_value(org.creation_payload(Some("my_org".to_string()))).unwrap();

        assert_eq!(
            payload,
            json!({
                "name": "my_org",
                "title": "My Org",
                "extras": [{"key": "region", "value": "north"}]
            })
        );
    }

    #[test]
    fn test_dataset_payload_drops_server_fields_and_resources() {
        let dataset: SourceDataset = serde_json::from_value(json!({
            "id": "ds-1",
            "name": "Air Quality",
            "title": "Air quality",
            "metadata_created": "2019-01-01",
            "metadata_modified": "2020-01-01",
            "creator_user_id": "u1",
            "private": false,
            "owner_org": "org-1",
            "tags": [{"id": "t1", "name": "air", "display_name": "air", "state": "active"}],
            "resources": [{"id": "r1", "url": "http://x/r1.csv", "format": "CSV"}]
        }))
        .unwrap();

        assert_eq!(dataset.resources().len(), 1);

        let payload = serde_json::to_value(
            dataset.creation_payload(Some("air_quality".to_string()), Some("org-1-target".to_string())),
        )
        .unwrap();
        assert_eq!(
            payload,
            json!({
                "name": "air_quality",
                "title": "Air quality",
                "owner_org": "org-1-target",
                "tags": [{"name": "air"}]
            })
        );
    }

    #[test]
    fn test_dataset_payload_without_owner() {
        let dataset = SourceDataset {
            id: "ds-1".to_string(),
            owner_org: Some("unknown".to_string()),
            ..Default::default()
        };
        let payload = serde_json::to_value(dataset.creation_payload(None, None)).unwrap();
        assert!(payload.get("owner_org").is_none());
    }

    #[test]
    fn test_resource_form_normalizes_fields() {
        let resource = SourceResource {
            id: "r1".to_string(),
            url: Some("http://x/r1.csv".to_string()),
            format: Some("CSV".to_string()),
            name: Some("n".repeat(150)),
            description: None,
            mimetype: None,
        };

        let form = resource.upload_form("target-ds");
        assert_eq!(form.name.as_deref().map(str::len), Some(100));
        assert_eq!(form.description, "");

        let fields = form.fields();
        assert!(fields.contains(&("package_id", "target-ds".to_string())));
        assert!(fields.contains(&("description", String::new())));
        assert!(!fields.iter().any(|(k, _)| *k == "mimetype"));
    }

    #[test]
    fn test_resource_fallback_defaults() {
        let form = SourceResource::default().upload_form("target-ds");
        assert_eq!(
            form.fallback(),
            ResourceFallback {
                package_id: "target-ds".to_string(),
                name: "Resource".to_string(),
                url: "http://example.com".to_string(),
            }
        );
    }

    #[test]
    fn test_download_url_ignores_blank() {
        let resource = SourceResource {
            url: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(resource.download_url(), None);
    }

    #[test]
    fn test_result_helpers() {
        assert_eq!(result_id(&json!({"id": "abc"})), Some("abc".to_string()));
        assert_eq!(result_id(&json!({"id": ""})), None);
        assert_eq!(result_id(&Value::Null), None);
        assert_eq!(string_list(&json!(["a", 1, "b"])), vec!["a", "b"]);
        assert!(string_list(&json!({"a": 1})).is_empty());
    }

    #[test]
    fn test_reconciliation_accessors() {
        assert_eq!(Reconciliation::Created("a".into()).target_id(), Some("a"));
        assert!(Reconciliation::Reused("b".into()).is_success());
        assert!(!Reconciliation::Failed("x".into()).is_success());
        assert!(DatasetOutcome::failed("x").reconciliation.target_id().is_none());
    }
}
