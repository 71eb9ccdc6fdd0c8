// Migration tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # CKAN Catalog Migration
//!
//! `ckan-migrate` is a CLI tool and library for copying organizations,
//! datasets and resource files from one CKAN catalog to another through
//! the action API.
//!
//! ## Phases
//!
//! | Phase | Source actions | Target actions |
//! |-------|----------------|----------------|
//! | Pre-flight | | `status_show` |
//! | Organizations | `organization_list`, `organization_show` | `organization_show`, `organization_create` |
//! | Datasets | `package_list`, `package_show`, `organization_show` | `package_show`, `package_create` |
//! | Resources | file download | `resource_create` (multipart) |
//!
//! Everything downloaded is staged under the working directory. The
//! source → target organization id mapping is persisted there too, which
//! makes re-runs skip organizations that are already resolved.
//!
//! ## Quick Start
//!
//! ```bash
//! ckan-migrate ckan_migration_config.json
//!
//! # Only two organizations and their datasets, without file payloads
//! ckan-migrate --orgs health water --skip-resources
//! ```
//!
//! ## Configuration Example
//!
//! ```json
//! {
//!   "source_url": "http://source-ckan-url",
//!   "source_api_key": "your-source-api-key",
//!   "target_url": "http://target-ckan-url",
//!   "target_api_key": "your-target-api-key",
//!   "work_dir": "ckan_migration"
//! }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod mapping;
pub mod migrate;
pub mod model;
pub mod pipeline;
pub mod retry;
pub mod sanitize;
pub mod staging;
pub mod ui;

pub use client::{ActionResponse, CkanClient, Side};
pub use config::MigrationConfig;
pub use error::{Error, Result};
pub use mapping::OrgMapping;
pub use migrate::MigrationContext;
pub use model::{DatasetOutcome, Reconciliation, ResourceOutcome};
pub use pipeline::{MigrationOptions, MigrationPlan, MigrationStats, Pipeline};
pub use retry::RetryConfig;
pub use sanitize::sanitize_name;
pub use staging::StagingArea;
