use crate::request::{argument_errors, IncomingVersion, STORAGE_ROOT_INVALID};
use chrono::{DateTime, Utc};
use pcat_db::{
    CatalogSnapshot, CatalogStore, CatalogWrite, PersistenceError, RecordChanges, WriteBatch,
};
use pcat_moab::{DirMoab, LayoutValidator, ObservedMoab, StructureValidator};
use pcat_results::{AuditResults, Detail, MOAB_RECORD, PRESERVED_OBJECT};
use pcat_schemas::{Druid, MoabRecord, StorageRoot};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Check names carried by every [`AuditResults`] the engine returns.
pub mod check_names {
    pub const CHECK_EXISTENCE: &str = "check_existence";
    pub const CREATE: &str = "create";
    pub const CREATE_AFTER_VALIDATION: &str = "create_after_validation";
    pub const UPDATE_VERSION: &str = "update_version";
    pub const UPDATE_VERSION_AFTER_VALIDATION: &str = "update_version_after_validation";
    pub const CONFIRM_VERSION: &str = "confirm_version";
    pub const CHECK_CATALOG_VERSION: &str = "check_catalog_version";
    pub const VALIDATE_CHECKSUMS: &str = "validate_checksums";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Passed straight to the structural validator.
    pub allow_content_subdirs: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            allow_content_subdirs: true,
        }
    }
}

/// Opens the observed moab for a druid on a storage root.
pub trait MoabSource: Send + Sync {
    fn open(&self, root: &StorageRoot, druid: &Druid) -> Box<dyn ObservedMoab>;
}

/// Moabs laid out in druid trees under each root's storage location.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirMoabSource;

impl MoabSource for DirMoabSource {
    fn open(&self, root: &StorageRoot, druid: &Druid) -> Box<dyn ObservedMoab> {
        Box::new(DirMoab::new(Path::new(&root.storage_location), druid.clone()))
    }
}

/// Version Reconciliation Engine.
///
/// Each operation handles one druid on one storage root and returns the
/// finished [`AuditResults`]. Expected failures (bad input, disagreement,
/// persistence errors) are results, never `Err`. All catalog writes of one
/// invocation go through a single [`WriteBatch`], committed once.
pub struct Reconciler {
    pub(crate) store: Arc<dyn CatalogStore>,
    moabs: Arc<dyn MoabSource>,
    validator: Arc<dyn StructureValidator>,
    pub(crate) config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(store: Arc<dyn CatalogStore>, config: ReconcileConfig) -> Self {
        Self {
            store,
            moabs: Arc::new(DirMoabSource),
            validator: Arc::new(LayoutValidator),
            config,
        }
    }

    pub fn with_moab_source(mut self, moabs: Arc<dyn MoabSource>) -> Self {
        self.moabs = moabs;
        self
    }

    pub fn with_structure_validator(mut self, validator: Arc<dyn StructureValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Validate arguments, resolve the storage root, and read catalog state.
    /// `None` means the invocation is over; `results` says why.
    pub(crate) async fn begin(
        &self,
        druid: &str,
        version: Option<&IncomingVersion>,
        size: Option<i64>,
        storage_root: &str,
        results: &mut AuditResults,
    ) -> Option<Invocation> {
        let mut errors = argument_errors(druid, version, size);

        let root = match self.store.storage_root(storage_root).await {
            Ok(r) => r,
            Err(e) if !errors.is_empty() => {
                warn!(storage_root, error = %e, "storage root lookup failed");
                debug!(druid, storage_root, ?errors, "invalid arguments");
                results.add(Detail::InvalidArguments { errors });
                return None;
            }
            Err(e) => {
                record_persistence_failure(results, &e);
                return None;
            }
        };
        if root.is_none() {
            errors.push(STORAGE_ROOT_INVALID.to_string());
        }

        let (druid, root) = match (Druid::parse(druid).ok(), root) {
            (Some(d), Some(r)) if errors.is_empty() => (d, r),
            _ => {
                debug!(druid, storage_root, ?errors, "invalid arguments");
                results.add(Detail::InvalidArguments { errors });
                return None;
            }
        };

        let snapshot = match self.store.load(&druid, root.id).await {
            Ok(s) => s,
            Err(e) => {
                record_persistence_failure(results, &e);
                return None;
            }
        };

        let moab = self.moabs.open(&root, &druid);
        Some(Invocation {
            druid,
            root,
            moab,
            snapshot,
            now: Utc::now(),
            structure_errors: None,
        })
    }

    /// Commit the batch. On failure the accumulator loses every result that
    /// claimed a write and gains `persistence_failed`.
    pub(crate) async fn commit(&self, batch: WriteBatch, results: &mut AuditResults) -> bool {
        match self.store.commit(batch).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    druid = %results.druid,
                    check_name = %results.check_name,
                    category = e.category(),
                    error = %e,
                    "catalog transaction rolled back"
                );
                record_persistence_failure(results, &e);
                false
            }
        }
    }

    /// Run (once per invocation) the structural validator. Adds `invalid_moab`
    /// the first time errors are seen. Returns whether any were found.
    pub(crate) fn has_structural_errors(
        &self,
        inv: &mut Invocation,
        results: &mut AuditResults,
    ) -> bool {
        if let Some(errors) = &inv.structure_errors {
            return !errors.is_empty();
        }
        let errors = self
            .validator
            .validate(inv.moab.as_ref(), self.config.allow_content_subdirs);
        if !errors.is_empty() {
            results.add(Detail::InvalidMoab {
                errors: errors.clone(),
            });
        }
        let invalid = !errors.is_empty();
        inv.structure_errors = Some(errors);
        invalid
    }
}

pub(crate) fn record_persistence_failure(results: &mut AuditResults, e: &PersistenceError) {
    results.remove_mutation_results();
    results.add(Detail::PersistenceFailed {
        category: e.category().to_string(),
        message: e.message(),
    });
}

/// State gathered for one invocation. Lives only as long as the call.
pub(crate) struct Invocation {
    pub druid: Druid,
    pub root: StorageRoot,
    pub moab: Box<dyn ObservedMoab>,
    pub snapshot: CatalogSnapshot,
    pub now: DateTime<Utc>,
    structure_errors: Option<Vec<String>>,
}

impl Invocation {
    pub fn structure_checked(&self) -> bool {
        self.structure_errors.is_some()
    }

    /// The existing record, or `does_not_exist` naming what is missing.
    pub fn existing_record(&self, results: &mut AuditResults) -> Option<MoabRecord> {
        match (&self.snapshot.object, &self.snapshot.record) {
            (_, Some(record)) => Some(record.clone()),
            (None, None) => {
                results.add(Detail::DoesNotExist {
                    db_obj_name: PRESERVED_OBJECT,
                });
                None
            }
            (Some(_), None) => {
                results.add(Detail::DoesNotExist {
                    db_obj_name: MOAB_RECORD,
                });
                None
            }
        }
    }

    /// The primary copy must agree with the object's current version before
    /// anything is compared. Adds `versions_disagree` and returns false if not.
    pub fn versions_agree(&self, results: &mut AuditResults) -> bool {
        let (Some(object), Some(primary_version)) =
            (&self.snapshot.object, self.snapshot.primary_version)
        else {
            return true;
        };
        if primary_version == object.current_version {
            return true;
        }
        warn!(
            druid = %self.druid,
            primary_version,
            current_version = object.current_version,
            "primary moab record and preserved object disagree"
        );
        results.add(Detail::VersionsDisagree {
            record_version: primary_version,
            current_version: object.current_version,
        });
        false
    }

    /// Queue the record update, and the object's version bump when the
    /// record is primary and moves past `current_version`.
    pub fn push_record_update(
        &self,
        batch: &mut WriteBatch,
        record: &MoabRecord,
        mut changes: RecordChanges,
        results: &AuditResults,
    ) {
        if self.structure_checked() {
            changes.last_moab_validation = Some(self.now);
        }
        changes.status_details = Some(results.to_status_details());
        let new_version = changes.version;

        batch.push(CatalogWrite::UpdateRecord {
            record_id: record.id,
            expected_version: record.version,
            changes,
        });

        if let (true, Some(object), Some(v)) =
            (record.is_primary, &self.snapshot.object, new_version)
        {
            if v > object.current_version {
                batch.push(CatalogWrite::AdvanceObjectVersion {
                    druid: self.druid.clone(),
                    expected_current_version: object.current_version,
                    new_version: v,
                });
            }
        }
    }
}

/// Summary line per invocation.
pub(crate) fn log_outcome(results: &AuditResults) {
    let codes: Vec<&str> = results.codes().iter().map(|c| c.as_str()).collect();
    debug!(
        druid = %results.druid,
        version = ?results.actual_version,
        storage_root = %results.storage_root,
        check_name = %results.check_name,
        ?codes,
        "audit finished"
    );
}
