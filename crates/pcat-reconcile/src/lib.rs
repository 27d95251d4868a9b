//! pcat-reconcile
//!
//! Version Reconciliation Engine.
//!
//! Operations, each scoped to one druid on one storage root:
//! - `check_existence`, `create`, `create_after_validation`
//! - `update_version`, `update_version_after_validation`, `confirm_version`
//! - `check_catalog_version` (catalog-to-moab) and `validate_checksums`
//!
//! Shape shared by all of them: validate arguments -> read catalog state ->
//! primary/object version agreement -> compare -> derive status -> one commit.
//! Nothing is raised for expected failures; everything lands in the returned
//! [`AuditResults`](pcat_results::AuditResults).

mod audit;
mod engine;
mod existence;
mod request;
mod version;

pub use engine::{check_names, DirMoabSource, MoabSource, ReconcileConfig, Reconciler};
pub use request::{AuditRequest, IncomingVersion};
