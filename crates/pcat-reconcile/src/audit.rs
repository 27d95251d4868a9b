use crate::engine::{check_names, log_outcome, Reconciler};
use pcat_db::RecordChanges;
use pcat_integrity::{derive_status, transition, ChecksumOutcome, ChecksumValidator, StatusInputs};
use pcat_results::{AuditResults, Detail};
use pcat_schemas::MoabStatus;
use tracing::{info, warn};

impl Reconciler {
    /// Catalog-to-moab audit: start from the catalog record and look at what
    /// storage holds.
    ///
    /// Absent moab: `moab_not_found`, status `not_found_on_storage`.
    /// Otherwise the on-disk version is compared with the record; a newer one
    /// is taken the way [`Reconciler::update_version_after_validation`] would.
    pub async fn check_catalog_version(&self, druid: &str, storage_root: &str) -> AuditResults {
        let mut results =
            AuditResults::new(druid, None, storage_root, check_names::CHECK_CATALOG_VERSION);
        let Some(mut inv) = self.begin(druid, None, None, storage_root, &mut results).await else {
            return results;
        };
        let Some(record) = inv.existing_record(&mut results) else {
            log_outcome(&results);
            return results;
        };
        if !inv.versions_agree(&mut results) {
            log_outcome(&results);
            return results;
        }

        if !inv.moab.exists() {
            results.add(Detail::MoabNotFound {
                object_path: inv.moab.object_path().display().to_string(),
            });
            let status = transition(record.status, MoabStatus::NotFoundOnStorage, &mut results);
            let changes = RecordChanges {
                status: Some(status),
                last_version_audit: Some(inv.now),
                ..Default::default()
            };
            self.finish(&inv, &record, changes, &mut results).await;
            return results;
        }

        let observed = match inv.moab.current_version() {
            Ok(v) => v,
            Err(e) => {
                warn!(druid = %inv.druid, error = %e, "unable to read on-disk version");
                if !self.has_structural_errors(&mut inv, &mut results) {
                    results.add(Detail::InvalidMoab {
                        errors: vec![e.to_string()],
                    });
                }
                let inputs = StatusInputs {
                    found_on_storage: true,
                    has_structural_errors: true,
                    version_as_expected: false,
                    checksums_validated: false,
                    checksum_passed: false,
                };
                let status = derive_status(&inputs, record.status, &mut results);
                let changes = RecordChanges {
                    status: Some(status),
                    last_version_audit: Some(inv.now),
                    ..Default::default()
                };
                self.finish(&inv, &record, changes, &mut results).await;
                return results;
            }
        };
        results.actual_version = Some(observed);

        let size = inv.moab.size().ok().filter(|s| *s > 0);
        self.compare_with_catalog(&mut inv, &record, observed, size, &mut results)
            .await;
        results
    }

    /// Checksum-validation audit.
    ///
    /// The validator walks and hashes every file before any write is issued;
    /// only the final status and timestamp update is transactional.
    /// Findings force `invalid_checksum`; an absent moab forces
    /// `not_found_on_storage`; a clean pass re-derives the status with the
    /// checksum verdict in hand.
    pub async fn validate_checksums(&self, druid: &str, storage_root: &str) -> AuditResults {
        let mut results =
            AuditResults::new(druid, None, storage_root, check_names::VALIDATE_CHECKSUMS);
        let Some(mut inv) = self.begin(druid, None, None, storage_root, &mut results).await else {
            return results;
        };
        let Some(record) = inv.existing_record(&mut results) else {
            log_outcome(&results);
            return results;
        };
        if !inv.versions_agree(&mut results) {
            log_outcome(&results);
            return results;
        }

        let outcome = ChecksumValidator::new(inv.moab.as_ref()).validate(&mut results);

        let status = match outcome {
            ChecksumOutcome::NotFound => {
                transition(record.status, MoabStatus::NotFoundOnStorage, &mut results)
            }
            ChecksumOutcome::Failed { findings } => {
                info!(
                    druid = %inv.druid,
                    storage_root = %inv.root.name,
                    findings,
                    "checksum validation failed"
                );
                transition(record.status, MoabStatus::InvalidChecksum, &mut results)
            }
            ChecksumOutcome::Passed => {
                let on_disk = inv.moab.current_version().ok();
                results.actual_version = on_disk;
                let invalid = self.has_structural_errors(&mut inv, &mut results);
                let inputs = StatusInputs {
                    found_on_storage: true,
                    has_structural_errors: invalid,
                    version_as_expected: on_disk == Some(record.version),
                    checksums_validated: true,
                    checksum_passed: true,
                };
                derive_status(&inputs, record.status, &mut results)
            }
        };

        let changes = RecordChanges {
            status: Some(status),
            last_checksum_validation: Some(inv.now),
            ..Default::default()
        };
        self.finish(&inv, &record, changes, &mut results).await;
        results
    }
}
