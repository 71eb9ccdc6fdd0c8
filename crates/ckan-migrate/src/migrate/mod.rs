//! Per-entity migrators and the context they share.
//!
//! Migrators never return errors. Each item ends in an outcome value
//! ([`Reconciliation`](crate::model::Reconciliation),
//! [`DatasetOutcome`](crate::model::DatasetOutcome) or
//! [`ResourceOutcome`](crate::model::ResourceOutcome)) and the reason for
//! any failure is logged where it happens.

pub mod context;
pub mod datasets;
pub mod organizations;
pub mod resources;

pub use context::MigrationContext;
pub use datasets::{DatasetMigrator, DatasetSelection, StagedDataset, StagedResource};
pub use organizations::{OrganizationMigrator, StagedOrganization};
pub use resources::ResourceMigrator;
