use pcat_results::{AuditResults, Detail};
use pcat_schemas::MoabStatus;

/// Signals gathered during one invocation that decide a record's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusInputs {
    pub found_on_storage: bool,
    pub has_structural_errors: bool,
    /// Whether the observed version is what this operation expected.
    pub version_as_expected: bool,
    /// Caller asserts it performed checksum validation out of band.
    pub checksums_validated: bool,
    /// A checksum pass succeeded (or was vouched for) during this invocation.
    pub checksum_passed: bool,
}

impl StatusInputs {
    /// Moab present and structurally sound, version as expected.
    pub fn seen_on_disk(version_as_expected: bool) -> Self {
        Self {
            found_on_storage: true,
            has_structural_errors: false,
            version_as_expected,
            checksums_validated: false,
            checksum_passed: false,
        }
    }
}

/// Map the invocation's signals to a status. First match wins:
///
/// 1. not found on storage      -> `not_found_on_storage`
/// 2. structural errors         -> `invalid_moab`
/// 3. version not as expected   -> `unexpected_version_on_storage`
/// 4. checksum pass this run    -> `ok`
/// 5. otherwise                 -> `validity_unknown`
///
/// A record sitting at `invalid_checksum` only leaves that state when the
/// caller vouches for checksums; otherwise `unable_to_check_status` is recorded
/// and the prior status is returned. A `status_changed` result is recorded
/// whenever the returned status differs from `prior`.
pub fn derive_status(
    inputs: &StatusInputs,
    prior: MoabStatus,
    results: &mut AuditResults,
) -> MoabStatus {
    if prior == MoabStatus::InvalidChecksum && !inputs.checksums_validated {
        results.add(Detail::UnableToCheckStatus {
            current_status: prior,
        });
        return prior;
    }

    transition(prior, status_for(inputs), results)
}

/// The precedence table alone, for records being created (no prior status).
pub fn status_for(inputs: &StatusInputs) -> MoabStatus {
    if !inputs.found_on_storage {
        MoabStatus::NotFoundOnStorage
    } else if inputs.has_structural_errors {
        MoabStatus::InvalidMoab
    } else if !inputs.version_as_expected {
        MoabStatus::UnexpectedVersionOnStorage
    } else if inputs.checksum_passed {
        MoabStatus::Ok
    } else {
        MoabStatus::ValidityUnknown
    }
}

/// Assign `next` directly (no derivation), recording the change if any.
pub fn transition(prior: MoabStatus, next: MoabStatus, results: &mut AuditResults) -> MoabStatus {
    if next != prior {
        results.add(Detail::StatusChanged {
            old_status: prior,
            new_status: next,
        });
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcat_results::ResultCode;

    fn results() -> AuditResults {
        AuditResults::new("bj102hs9687", Some(1), "fixture_sr1", "unit")
    }

    fn inputs() -> StatusInputs {
        StatusInputs::seen_on_disk(true)
    }

    #[test]
    fn precedence_not_found_beats_everything() {
        let mut r = results();
        let i = StatusInputs {
            found_on_storage: false,
            has_structural_errors: true,
            version_as_expected: false,
            checksums_validated: true,
            checksum_passed: true,
        };
        assert_eq!(derive_status(&i, MoabStatus::Ok, &mut r), MoabStatus::NotFoundOnStorage);
    }

    #[test]
    fn precedence_structure_then_version_then_checksum() {
        let mut r = results();
        let mut i = inputs();
        i.has_structural_errors = true;
        i.version_as_expected = false;
        assert_eq!(derive_status(&i, MoabStatus::Ok, &mut r), MoabStatus::InvalidMoab);

        i.has_structural_errors = false;
        assert_eq!(
            derive_status(&i, MoabStatus::Ok, &mut r),
            MoabStatus::UnexpectedVersionOnStorage
        );

        i.version_as_expected = true;
        i.checksum_passed = true;
        assert_eq!(derive_status(&i, MoabStatus::ValidityUnknown, &mut r), MoabStatus::Ok);

        i.checksum_passed = false;
        assert_eq!(derive_status(&i, MoabStatus::Ok, &mut r), MoabStatus::ValidityUnknown);
    }

    #[test]
    fn creation_status_needs_no_prior() {
        let mut i = inputs();
        assert_eq!(status_for(&i), MoabStatus::ValidityUnknown);
        i.checksum_passed = true;
        assert_eq!(status_for(&i), MoabStatus::Ok);
        i.has_structural_errors = true;
        assert_eq!(status_for(&i), MoabStatus::InvalidMoab);
    }

    #[test]
    fn unchanged_status_records_nothing() {
        let mut r = results();
        let st = derive_status(&inputs(), MoabStatus::ValidityUnknown, &mut r);
        assert_eq!(st, MoabStatus::ValidityUnknown);
        assert!(r.is_empty());
    }

    #[test]
    fn changed_status_records_old_and_new() {
        let mut r = results();
        derive_status(&inputs(), MoabStatus::InvalidMoab, &mut r);
        assert_eq!(r.codes(), vec![ResultCode::StatusChanged]);
        assert_eq!(
            r.results()[0].message,
            "MoabRecord status changed from invalid_moab to validity_unknown"
        );
    }

    #[test]
    fn invalid_checksum_is_sticky_without_caller_assertion() {
        let mut r = results();
        let st = derive_status(&inputs(), MoabStatus::InvalidChecksum, &mut r);
        assert_eq!(st, MoabStatus::InvalidChecksum);
        assert_eq!(r.codes(), vec![ResultCode::UnableToCheckStatus]);

        let mut r = results();
        let mut i = inputs();
        i.checksums_validated = true;
        i.checksum_passed = true;
        assert_eq!(derive_status(&i, MoabStatus::InvalidChecksum, &mut r), MoabStatus::Ok);
        assert_eq!(r.codes(), vec![ResultCode::StatusChanged]);
    }
}
