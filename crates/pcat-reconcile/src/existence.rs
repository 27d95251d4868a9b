use crate::engine::{check_names, log_outcome, Invocation, Reconciler};
use crate::request::AuditRequest;
use pcat_db::{CatalogWrite, NewMoabRecord, WriteBatch};
use pcat_integrity::{status_for, StatusInputs};
use pcat_results::{AuditResults, Detail, MOAB_RECORD};
use pcat_schemas::MoabStatus;
use tracing::info;

impl Reconciler {
    /// Something was seen on storage: make sure the catalog knows about it.
    ///
    /// No record yet: `does_not_exist`, validate structure, create with
    /// `validity_unknown` (or `invalid_moab`, or `not_found_on_storage` when
    /// nothing is on disk), `created`. Record present:
    /// three-way comparison of the observed version against it.
    pub async fn check_existence(&self, req: &AuditRequest) -> AuditResults {
        let mut results = AuditResults::new(
            &req.druid,
            req.incoming_version.parse(),
            &req.storage_root,
            check_names::CHECK_EXISTENCE,
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
        let version = results.actual_version.unwrap_or_default();

        match inv.snapshot.record.clone() {
            Some(record) => {
                if inv.versions_agree(&mut results) {
                    self.compare_with_catalog(
                        &mut inv,
                        &record,
                        version,
                        req.incoming_size,
                        &mut results,
                    )
                    .await;
                }
            }
            None => {
                results.add(Detail::DoesNotExist {
                    db_obj_name: MOAB_RECORD,
                });
                let found = inv.moab.exists();
                let invalid = found && self.has_structural_errors(&mut inv, &mut results);
                let status = status_for(&StatusInputs {
                    found_on_storage: found,
                    has_structural_errors: invalid,
                    version_as_expected: true,
                    checksums_validated: false,
                    checksum_passed: false,
                });
                self.create_record(&inv, version, req.incoming_size, status, false, &mut results)
                    .await;
            }
        }

        log_outcome(&results);
        results
    }

    /// First-time creation without looking at the layout. Status is `ok` when
    /// the caller vouches for checksums, `validity_unknown` otherwise.
    pub async fn create(&self, req: &AuditRequest, checksums_validated: bool) -> AuditResults {
        self.create_with(req, checksums_validated, false, check_names::CREATE)
            .await
    }

    /// First-time creation after structural validation; `invalid_moab` wins
    /// over everything else.
    pub async fn create_after_validation(
        &self,
        req: &AuditRequest,
        checksums_validated: bool,
    ) -> AuditResults {
        self.create_with(
            req,
            checksums_validated,
            true,
            check_names::CREATE_AFTER_VALIDATION,
        )
        .await
    }

    async fn create_with(
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
        let version = results.actual_version.unwrap_or_default();

        if inv.snapshot.record.is_some() {
            results.add(Detail::AlreadyExists {
                db_obj_name: MOAB_RECORD,
            });
            log_outcome(&results);
            return results;
        }

        let invalid = validate_structure && self.has_structural_errors(&mut inv, &mut results);
        let status = status_for(&StatusInputs {
            found_on_storage: true,
            has_structural_errors: invalid,
            version_as_expected: true,
            checksums_validated,
            checksum_passed: checksums_validated,
        });
        self.create_record(
            &inv,
            version,
            req.incoming_size,
            status,
            checksums_validated,
            &mut results,
        )
        .await;

        log_outcome(&results);
        results
    }

    /// Insert the record (and the object, if this is its first copy) in one
    /// transaction. `created` is added only after the commit succeeds.
    async fn create_record(
        &self,
        inv: &Invocation,
        version: i32,
        size: Option<i64>,
        status: MoabStatus,
        checksums_validated: bool,
        results: &mut AuditResults,
    ) {
        let mut batch = WriteBatch::new();
        if inv.snapshot.object.is_none() {
            batch.push(CatalogWrite::CreateObject {
                druid: inv.druid.clone(),
                current_version: version,
            });
        }
        batch.push(CatalogWrite::CreateRecord {
            druid: inv.druid.clone(),
            record: NewMoabRecord {
                storage_root_id: inv.root.id,
                version,
                size,
                status,
                status_details: Some(results.to_status_details()),
                last_version_audit: Some(inv.now),
                last_moab_validation: inv.structure_checked().then_some(inv.now),
                last_checksum_validation: checksums_validated.then_some(inv.now),
            },
        });

        if self.commit(batch, results).await {
            info!(
                druid = %inv.druid,
                storage_root = %inv.root.name,
                version,
                status = %status,
                "moab record created"
            );
            results.add(Detail::Created);
        }
    }
}
