use crate::engine::{check_names, log_outcome, Invocation, Reconciler};
use crate::request::AuditRequest;
use pcat_db::{RecordChanges, WriteBatch};
use pcat_integrity::{derive_status, transition, StatusInputs};
use pcat_results::{AuditResults, Detail, MOAB_RECORD};
use pcat_schemas::{MoabRecord, MoabStatus};
use std::cmp::Ordering;

impl Reconciler {
    /// Blind update: trusts `checksums_validated` instead of walking the layout.
    ///
    /// observed > catalog moves the record (and, from the primary, the object)
    /// forward. Equal is `version_matches`, with the status re-derived from the
    /// caller's flag unless already `ok`. observed < catalog is
    /// `unexpected_version` and `unexpected_version_on_storage`.
    pub async fn update_version(
        &self,
        req: &AuditRequest,
        checksums_validated: bool,
    ) -> AuditResults {
        self.update_with(req, checksums_validated, false, check_names::UPDATE_VERSION)
            .await
    }

    /// Like [`Reconciler::update_version`], but the layout is validated first
    /// and structural errors force `invalid_moab`. Version and size still move
    /// forward when observed > catalog.
    pub async fn update_version_after_validation(
        &self,
        req: &AuditRequest,
        checksums_validated: bool,
    ) -> AuditResults {
        self.update_with(
            req,
            checksums_validated,
            true,
            check_names::UPDATE_VERSION_AFTER_VALIDATION,
        )
        .await
    }

    async fn update_with(
        &self,
        req: &AuditRequest,
        checksums_validated: bool,
        validate_structure: bool,
        check_name: &str,
    ) -> AuditResults {
        let mut results = AuditResults::new(
            &req.druid,
            req.incoming_version.parse(),
            &req.storage_root,
            check_name,
        );
        let Some(mut inv) = self
            .begin(
                &req.druid,
                Some(&req.incoming_version),
                req.incoming_size,
                &req.storage_root,
                &mut results,
            )
            .await
        else {
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

        let observed = results.actual_version.unwrap_or_default();
        let invalid = validate_structure && self.has_structural_errors(&mut inv, &mut results);
        let inputs = StatusInputs {
            found_on_storage: true,
            has_structural_errors: invalid,
            version_as_expected: true,
            checksums_validated,
            checksum_passed: checksums_validated,
        };

        let mut changes = RecordChanges {
            last_version_audit: Some(inv.now),
            last_checksum_validation: checksums_validated.then_some(inv.now),
            ..Default::default()
        };

        match observed.cmp(&record.version) {
            Ordering::Greater => {
                results.add(Detail::ActualGreaterThanCatalog {
                    actual_version: observed,
                    db_obj_name: MOAB_RECORD,
                    db_obj_version: record.version,
                });
                changes.status = Some(derive_status(&inputs, record.status, &mut results));
                changes.version = Some(observed);
                changes.size = req.incoming_size;
            }
            Ordering::Equal => {
                results.add(Detail::VersionMatches {
                    actual_version: observed,
                    db_obj_name: MOAB_RECORD,
                });
                if record.status != MoabStatus::Ok || invalid {
                    changes.status = Some(derive_status(&inputs, record.status, &mut results));
                }
            }
            Ordering::Less => {
                results.add(Detail::UnexpectedVersion {
                    actual_version: observed,
                    db_obj_name: MOAB_RECORD,
                    db_obj_version: record.version,
                });
                let forced = older_version_status(invalid);
                changes.status = Some(transition(record.status, forced, &mut results));
            }
        }

        self.finish(&inv, &record, changes, &mut results).await;
        results
    }

    /// Re-check a version the catalog already believes in.
    ///
    /// Equal: `version_matches`, and the status is re-derived from the layout
    /// unless it is already `ok`. Otherwise `unexpected_version` and the
    /// status moves to `unexpected_version_on_storage` (or `invalid_moab`).
    /// Never changes version or size.
    pub async fn confirm_version(&self, req: &AuditRequest) -> AuditResults {
        let mut results = AuditResults::new(
            &req.druid,
            req.incoming_version.parse(),
            &req.storage_root,
            check_names::CONFIRM_VERSION,
        );
        let Some(mut inv) = self
            .begin(
                &req.druid,
                Some(&req.incoming_version),
                req.incoming_size,
                &req.storage_root,
                &mut results,
            )
            .await
        else {
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

        let observed = results.actual_version.unwrap_or_default();
        let mut status = record.status;

        if observed == record.version {
            results.add(Detail::VersionMatches {
                actual_version: observed,
                db_obj_name: MOAB_RECORD,
            });
            if record.status != MoabStatus::Ok {
                status = self.rederive(&mut inv, &record, &mut results);
            }
        } else {
            results.add(Detail::UnexpectedVersion {
                actual_version: observed,
                db_obj_name: MOAB_RECORD,
                db_obj_version: record.version,
            });
            status = self.force_older_version(&mut inv, &record, &mut results);
        }

        let changes = RecordChanges {
            status: Some(status),
            last_version_audit: Some(inv.now),
            ..Default::default()
        };
        self.finish(&inv, &record, changes, &mut results).await;
        results
    }

    /// Derive status from the layout (validated here if not already) for a
    /// version storage and catalog agree on.
    pub(crate) fn rederive(
        &self,
        inv: &mut Invocation,
        record: &MoabRecord,
        results: &mut AuditResults,
    ) -> MoabStatus {
        let invalid = self.has_structural_errors(inv, results);
        let inputs = StatusInputs {
            found_on_storage: inv.moab.exists(),
            has_structural_errors: invalid,
            version_as_expected: true,
            checksums_validated: false,
            checksum_passed: false,
        };
        derive_status(&inputs, record.status, results)
    }

    /// Storage holds an older version than the catalog. The status is
    /// assigned rather than derived, so the `invalid_checksum` guard does not
    /// apply; a broken layout still wins.
    pub(crate) fn force_older_version(
        &self,
        inv: &mut Invocation,
        record: &MoabRecord,
        results: &mut AuditResults,
    ) -> MoabStatus {
        let invalid = self.has_structural_errors(inv, results);
        transition(record.status, older_version_status(invalid), results)
    }

    /// observed vs catalog ordering for audits that discover the version on
    /// their own (existence check, catalog-to-moab).
    pub(crate) async fn compare_with_catalog(
        &self,
        inv: &mut Invocation,
        record: &MoabRecord,
        observed: i32,
        size: Option<i64>,
        results: &mut AuditResults,
    ) {
        let mut changes = RecordChanges {
            last_version_audit: Some(inv.now),
            ..Default::default()
        };

        match observed.cmp(&record.version) {
            Ordering::Equal => {
                results.add(Detail::VersionMatches {
                    actual_version: observed,
                    db_obj_name: MOAB_RECORD,
                });
                if record.status != MoabStatus::Ok {
                    changes.status = Some(self.rederive(inv, record, results));
                }
            }
            Ordering::Greater => {
                results.add(Detail::ActualGreaterThanCatalog {
                    actual_version: observed,
                    db_obj_name: MOAB_RECORD,
                    db_obj_version: record.version,
                });
                changes.status = Some(self.rederive(inv, record, results));
                changes.version = Some(observed);
                changes.size = size;
            }
            Ordering::Less => {
                results.add(Detail::ActualLessThanCatalog {
                    actual_version: observed,
                    db_obj_name: MOAB_RECORD,
                    db_obj_version: record.version,
                });
                changes.status = Some(self.force_older_version(inv, record, results));
            }
        }

        self.finish(inv, record, changes, results).await;
    }

    /// Single commit point for operations on an existing record.
    pub(crate) async fn finish(
        &self,
        inv: &Invocation,
        record: &MoabRecord,
        changes: RecordChanges,
        results: &mut AuditResults,
    ) {
        let mut batch = WriteBatch::new();
        inv.push_record_update(&mut batch, record, changes, results);
        self.commit(batch, results).await;
        log_outcome(results);
    }
}

fn older_version_status(has_structural_errors: bool) -> MoabStatus {
    if has_structural_errors {
        MoabStatus::InvalidMoab
    } else {
        MoabStatus::UnexpectedVersionOnStorage
    }
}
