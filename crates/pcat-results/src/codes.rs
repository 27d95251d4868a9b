use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of one kind of audit finding.
///
/// Severity and audience membership are fixed per code; see
/// [`ResultCode::severity`], [`ResultCode::is_workflow_reportable`] and
/// [`ResultCode::is_error_tracker_reportable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    InvalidArguments,
    VersionMatches,
    ActualGreaterThanCatalog,
    ActualLessThanCatalog,
    UnexpectedVersion,
    Created,
    AlreadyExists,
    DoesNotExist,
    PersistenceFailed,
    VersionsDisagree,
    MoabNotFound,
    InvalidMoab,
    StatusChanged,
    UnableToCheckStatus,
    FileNotInManifest,
    FileNotInMoab,
    ChecksumMismatch,
    ManifestNotInMoab,
    InvalidManifest,
    SignatureCatalogNotInMoab,
    FileNotInSignatureCatalog,
    ChecksumValid,
}

/// Log level used by the logging sink for a given code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl ResultCode {
    pub const ALL: [ResultCode; 22] = [
        ResultCode::InvalidArguments,
        ResultCode::VersionMatches,
        ResultCode::ActualGreaterThanCatalog,
        ResultCode::ActualLessThanCatalog,
        ResultCode::UnexpectedVersion,
        ResultCode::Created,
        ResultCode::AlreadyExists,
        ResultCode::DoesNotExist,
        ResultCode::PersistenceFailed,
        ResultCode::VersionsDisagree,
        ResultCode::MoabNotFound,
        ResultCode::InvalidMoab,
        ResultCode::StatusChanged,
        ResultCode::UnableToCheckStatus,
        ResultCode::FileNotInManifest,
        ResultCode::FileNotInMoab,
        ResultCode::ChecksumMismatch,
        ResultCode::ManifestNotInMoab,
        ResultCode::InvalidManifest,
        ResultCode::SignatureCatalogNotInMoab,
        ResultCode::FileNotInSignatureCatalog,
        ResultCode::ChecksumValid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::InvalidArguments => "invalid_arguments",
            ResultCode::VersionMatches => "version_matches",
            ResultCode::ActualGreaterThanCatalog => "actual_greater_than_catalog",
            ResultCode::ActualLessThanCatalog => "actual_less_than_catalog",
            ResultCode::UnexpectedVersion => "unexpected_version",
            ResultCode::Created => "created",
            ResultCode::AlreadyExists => "already_exists",
            ResultCode::DoesNotExist => "does_not_exist",
            ResultCode::PersistenceFailed => "persistence_failed",
            ResultCode::VersionsDisagree => "versions_disagree",
            ResultCode::MoabNotFound => "moab_not_found",
            ResultCode::InvalidMoab => "invalid_moab",
            ResultCode::StatusChanged => "status_changed",
            ResultCode::UnableToCheckStatus => "unable_to_check_status",
            ResultCode::FileNotInManifest => "file_not_in_manifest",
            ResultCode::FileNotInMoab => "file_not_in_moab",
            ResultCode::ChecksumMismatch => "checksum_mismatch",
            ResultCode::ManifestNotInMoab => "manifest_not_in_moab",
            ResultCode::InvalidManifest => "invalid_manifest",
            ResultCode::SignatureCatalogNotInMoab => "signature_catalog_not_in_moab",
            ResultCode::FileNotInSignatureCatalog => "file_not_in_signature_catalog",
            ResultCode::ChecksumValid => "checksum_valid",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ResultCode::VersionMatches
            | ResultCode::ActualGreaterThanCatalog
            | ResultCode::Created
            | ResultCode::StatusChanged
            | ResultCode::UnableToCheckStatus
            | ResultCode::ChecksumValid => Severity::Info,

            ResultCode::DoesNotExist => Severity::Warn,

            ResultCode::InvalidArguments
            | ResultCode::ActualLessThanCatalog
            | ResultCode::UnexpectedVersion
            | ResultCode::AlreadyExists
            | ResultCode::PersistenceFailed
            | ResultCode::VersionsDisagree
            | ResultCode::MoabNotFound
            | ResultCode::InvalidMoab
            | ResultCode::FileNotInManifest
            | ResultCode::FileNotInMoab
            | ResultCode::ChecksumMismatch
            | ResultCode::ManifestNotInMoab
            | ResultCode::InvalidManifest
            | ResultCode::SignatureCatalogNotInMoab
            | ResultCode::FileNotInSignatureCatalog => Severity::Error,
        }
    }

    /// Codes the workflow/orchestration sink turns into an error status.
    pub fn is_workflow_reportable(&self) -> bool {
        matches!(
            self,
            ResultCode::ActualLessThanCatalog
                | ResultCode::UnexpectedVersion
                | ResultCode::VersionsDisagree
                | ResultCode::MoabNotFound
                | ResultCode::InvalidMoab
                | ResultCode::FileNotInManifest
                | ResultCode::FileNotInMoab
                | ResultCode::ChecksumMismatch
                | ResultCode::ManifestNotInMoab
                | ResultCode::InvalidManifest
                | ResultCode::SignatureCatalogNotInMoab
                | ResultCode::FileNotInSignatureCatalog
        )
    }

    /// Codes that page a human through the error tracker.
    pub fn is_error_tracker_reportable(&self) -> bool {
        matches!(
            self,
            ResultCode::ActualLessThanCatalog
                | ResultCode::AlreadyExists
                | ResultCode::DoesNotExist
                | ResultCode::PersistenceFailed
        )
    }

    /// Codes that claim a row was written. They must not survive a rollback.
    pub fn implies_mutation(&self) -> bool {
        matches!(self, ResultCode::Created | ResultCode::StatusChanged)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
