//! Tests for organization migration.

use super::*;
use crate::migrate::context::test_support::context_for;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"success": true, "result": result}))
}

fn staged(id: &str, name: &str) -> StagedOrganization {
    StagedOrganization {
        metadata: SourceOrganization {
            id: id.to_string(),
            name: Some(name.to_string()),
            title: Some(name.to_string()),
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn test_upload_creates_with_sanitized_name() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/3/action/organization_create"))
        .and(body_json(json!({"name": "my_org", "title": "My Org!"})))
        .respond_with(ok(json!({"id": "org-1-target", "name": "my_org"})))
        .expect(1)
        .mount(&target)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context_for(&source.uri(), &target.uri(), dir.path());
    let outcome = OrganizationMigrator::new(&mut ctx)
        .upload(&staged("org-1", "My Org!"))
        .await;

    assert_eq!(outcome, Reconciliation::Created("org-1-target".to_string()));
    assert_eq!(ctx.mapping.get("org-1"), Some("org-1-target"));

    let persisted = std::fs::read_to_string(ctx.staging.mapping_path()).unwrap();
    assert!(persisted.contains("org-1-target"));
}

#[tokio::test]
async fn test_upload_reuses_existing_target_organization() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/organization_show"))
        .and(query_param("id", "health"))
        .respond_with(ok(json!({"id": "existing-id", "name": "health"})))
        .expect(1)
        .mount(&target)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/3/action/organization_create"))
        .respond_with(ok(json!({"id": "should-not-happen"})))
        .expect(0)
        .mount(&target)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context_for(&source.uri(), &target.uri(), dir.path());
    let outcome = OrganizationMigrator::new(&mut ctx)
        .upload(&staged("org-2", "health"))
        .await;

    assert_eq!(outcome, Reconciliation::Reused("existing-id".to_string()));
    assert_eq!(ctx.mapping.get("org-2"), Some("existing-id"));
}

#[tokio::test]
async fn test_upload_skips_mapped_organization_without_requests() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&target)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context_for(&source.uri(), &target.uri(), dir.path());
    ctx.mapping.insert("org-1", "already-there");

    let outcome = OrganizationMigrator::new(&mut ctx)
        .upload(&staged("org-1", "My Org!"))
        .await;

    assert_eq!(outcome, Reconciliation::Reused("already-there".to_string()));
    assert_eq!(ctx.mapping.len(), 1);
}

#[tokio::test]
async fn test_upload_failure_leaves_mapping_untouched() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/3/action/organization_create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": {"message": "Access denied"}
        })))
        .mount(&target)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context_for(&source.uri(), &target.uri(), dir.path());
    let outcome = OrganizationMigrator::new(&mut ctx)
        .upload(&staged("org-3", "denied"))
        .await;

    assert!(matches!(outcome, Reconciliation::Failed(reason) if reason.contains("Access denied")));
    assert!(ctx.mapping.is_empty());
}

#[tokio::test]
async fn test_list_without_filter_returns_everything() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/organization_list"))
        .respond_with(ok(json!(["org-a", "org-b"])))
        .mount(&source)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context_for(&source.uri(), &target.uri(), dir.path());
    let ids = OrganizationMigrator::new(&mut ctx).list(&[]).await;

    assert_eq!(ids, vec!["org-a", "org-b"]);
}

#[tokio::test]
async fn test_list_filter_matches_ids_then_names() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/organization_list"))
        .respond_with(ok(json!(["org-a", "org-b", "org-c"])))
        .mount(&source)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/organization_show"))
        .and(query_param("id", "org-b"))
        .respond_with(ok(json!({"id": "org-b", "name": "water"})))
        .expect(1)
        .mount(&source)
        .await;
    // Resolution stops once every entry is matched.
    Mock::given(method("GET"))
        .and(path("/api/3/action/organization_show"))
        .and(query_param("id", "org-c"))
        .respond_with(ok(json!({"id": "org-c", "name": "air"})))
        .expect(0)
        .mount(&source)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context_for(&source.uri(), &target.uri(), dir.path());
    let filter = vec!["org-a".to_string(), "water".to_string()];
    let ids = OrganizationMigrator::new(&mut ctx).list(&filter).await;

    assert_eq!(ids, vec!["org-a", "org-b"]);
}

#[tokio::test]
async fn test_list_failure_yields_empty() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;

    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context_for(&source.uri(), &target.uri(), dir.path());
    let ids = OrganizationMigrator::new(&mut ctx).list(&[]).await;

    assert!(ids.is_empty());
}

#[tokio::test]
async fn test_download_writes_staging_file() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/organization_show"))
        .and(query_param("id", "org-1"))
        .and(query_param("include_datasets", "false"))
        .respond_with(ok(json!({
            "id": "org-1",
            "name": "My Org!",
            "package_count": 4
        })))
        .mount(&source)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context_for(&source.uri(), &target.uri(), dir.path());
    let staged = OrganizationMigrator::new(&mut ctx)
        .download("org-1")
        .await
        .unwrap();

    assert_eq!(staged.metadata.name.as_deref(), Some("My Org!"));
    let raw = std::fs::read_to_string(dir.path().join("organizations/org-1.json")).unwrap();
    assert!(raw.contains("package_count"));
}

#[tokio::test]
async fn test_download_failure_returns_none() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;

    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context_for(&source.uri(), &target.uri(), dir.path());
    let staged = OrganizationMigrator::new(&mut ctx).download("missing").await;

    assert!(staged.is_none());
    assert!(!dir.path().join("organizations/missing.json").exists());
}
