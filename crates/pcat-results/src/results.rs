use crate::codes::ResultCode;
use pcat_schemas::MoabStatus;
use serde::Serialize;

/// Catalog table name used in rendered messages.
pub const MOAB_RECORD: &str = "MoabRecord";
pub const PRESERVED_OBJECT: &str = "PreservedObject";

/// Typed arguments for one finding. Each variant maps to exactly one
/// [`ResultCode`] and one message template, so a result can never be
/// rendered with a missing or unknown argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detail {
    InvalidArguments {
        errors: Vec<String>,
    },
    VersionMatches {
        actual_version: i32,
        db_obj_name: &'static str,
    },
    ActualGreaterThanCatalog {
        actual_version: i32,
        db_obj_name: &'static str,
        db_obj_version: i32,
    },
    ActualLessThanCatalog {
        actual_version: i32,
        db_obj_name: &'static str,
        db_obj_version: i32,
    },
    UnexpectedVersion {
        actual_version: i32,
        db_obj_name: &'static str,
        db_obj_version: i32,
    },
    Created,
    AlreadyExists {
        db_obj_name: &'static str,
    },
    DoesNotExist {
        db_obj_name: &'static str,
    },
    PersistenceFailed {
        category: String,
        message: String,
    },
    VersionsDisagree {
        record_version: i32,
        current_version: i32,
    },
    MoabNotFound {
        object_path: String,
    },
    InvalidMoab {
        errors: Vec<String>,
    },
    StatusChanged {
        old_status: MoabStatus,
        new_status: MoabStatus,
    },
    UnableToCheckStatus {
        current_status: MoabStatus,
    },
    FileNotInManifest {
        file_path: String,
        manifest_file_path: String,
    },
    FileNotInMoab {
        file_path: String,
        manifest_file_path: String,
    },
    ChecksumMismatch {
        file_path: String,
        version: String,
    },
    ManifestNotInMoab {
        manifest_file_path: String,
    },
    InvalidManifest {
        manifest_file_path: String,
    },
    SignatureCatalogNotInMoab {
        signature_catalog_path: String,
    },
    FileNotInSignatureCatalog {
        file_path: String,
    },
    ChecksumValid,
}

impl Detail {
    pub fn code(&self) -> ResultCode {
        match self {
            Detail::InvalidArguments { .. } => ResultCode::InvalidArguments,
            Detail::VersionMatches { .. } => ResultCode::VersionMatches,
            Detail::ActualGreaterThanCatalog { .. } => ResultCode::ActualGreaterThanCatalog,
            Detail::ActualLessThanCatalog { .. } => ResultCode::ActualLessThanCatalog,
            Detail::UnexpectedVersion { .. } => ResultCode::UnexpectedVersion,
            Detail::Created => ResultCode::Created,
            Detail::AlreadyExists { .. } => ResultCode::AlreadyExists,
            Detail::DoesNotExist { .. } => ResultCode::DoesNotExist,
            Detail::PersistenceFailed { .. } => ResultCode::PersistenceFailed,
            Detail::VersionsDisagree { .. } => ResultCode::VersionsDisagree,
            Detail::MoabNotFound { .. } => ResultCode::MoabNotFound,
            Detail::InvalidMoab { .. } => ResultCode::InvalidMoab,
            Detail::StatusChanged { .. } => ResultCode::StatusChanged,
            Detail::UnableToCheckStatus { .. } => ResultCode::UnableToCheckStatus,
            Detail::FileNotInManifest { .. } => ResultCode::FileNotInManifest,
            Detail::FileNotInMoab { .. } => ResultCode::FileNotInMoab,
            Detail::ChecksumMismatch { .. } => ResultCode::ChecksumMismatch,
            Detail::ManifestNotInMoab { .. } => ResultCode::ManifestNotInMoab,
            Detail::InvalidManifest { .. } => ResultCode::InvalidManifest,
            Detail::SignatureCatalogNotInMoab { .. } => ResultCode::SignatureCatalogNotInMoab,
            Detail::FileNotInSignatureCatalog { .. } => ResultCode::FileNotInSignatureCatalog,
            Detail::ChecksumValid => ResultCode::ChecksumValid,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Detail::InvalidArguments { errors } => {
                format!("encountered validation error(s): {}", errors.join(", "))
            }
            Detail::VersionMatches { actual_version, db_obj_name } => {
                format!("actual version ({actual_version}) matches {db_obj_name} db version")
            }
            Detail::ActualGreaterThanCatalog {
                actual_version,
                db_obj_name,
                db_obj_version,
            } => format!(
                "actual version ({actual_version}) greater than {db_obj_name} db version ({db_obj_version})"
            ),
            Detail::ActualLessThanCatalog {
                actual_version,
                db_obj_name,
                db_obj_version,
            } => format!(
                "actual version ({actual_version}) less than {db_obj_name} db version ({db_obj_version}); ERROR!"
            ),
            Detail::UnexpectedVersion {
                actual_version,
                db_obj_name,
                db_obj_version,
            } => format!(
                "actual version ({actual_version}) has unexpected relationship to {db_obj_name} db version ({db_obj_version}); ERROR!"
            ),
            Detail::Created => "added object to db as it did not exist".to_string(),
            Detail::AlreadyExists { db_obj_name } => {
                format!("{db_obj_name} db object already exists")
            }
            Detail::DoesNotExist { db_obj_name } => {
                format!("{db_obj_name} db object does not exist")
            }
            Detail::PersistenceFailed { category, message } => {
                format!("db update failed: {category}: {message}")
            }
            Detail::VersionsDisagree {
                record_version,
                current_version,
            } => format!(
                "{MOAB_RECORD} version {record_version} does not match {PRESERVED_OBJECT} current_version {current_version}"
            ),
            Detail::MoabNotFound { object_path } => {
                format!("Moab not found on storage at {object_path}")
            }
            Detail::InvalidMoab { errors } => {
                format!("Invalid Moab, validation errors: {}", errors.join(", "))
            }
            Detail::StatusChanged { old_status, new_status } => {
                format!("{MOAB_RECORD} status changed from {old_status} to {new_status}")
            }
            Detail::UnableToCheckStatus { current_status } => {
                format!("unable to validate when {MOAB_RECORD} status is {current_status}")
            }
            Detail::FileNotInManifest { file_path, manifest_file_path } => {
                format!("{file_path} is not in manifest {manifest_file_path}")
            }
            Detail::FileNotInMoab { file_path, manifest_file_path } => {
                format!("{manifest_file_path} refers to file ({file_path}) not found in Moab")
            }
            Detail::ChecksumMismatch { file_path, version } => format!(
                "checksums or size for {file_path} version {version} do not match entry in manifest or signature catalog"
            ),
            Detail::ManifestNotInMoab { manifest_file_path } => {
                format!("{manifest_file_path} not found in Moab")
            }
            Detail::InvalidManifest { manifest_file_path } => {
                format!("unable to parse {manifest_file_path} in Moab")
            }
            Detail::SignatureCatalogNotInMoab { signature_catalog_path } => {
                format!("{signature_catalog_path} not found in Moab")
            }
            Detail::FileNotInSignatureCatalog { file_path } => {
                format!("Moab file {file_path} was not found in Moab signature catalog")
            }
            Detail::ChecksumValid => "checksums for all files in Moab are valid".to_string(),
        }
    }
}

/// One rendered finding: `(code, message)` plus the typed arguments it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditResult {
    pub detail: Detail,
    pub message: String,
}

impl AuditResult {
    pub fn new(detail: Detail) -> Self {
        let message = detail.render();
        Self { detail, message }
    }

    pub fn code(&self) -> ResultCode {
        self.detail.code()
    }

    /// True for the status transition that closes an audit successfully.
    pub fn is_status_changed_to_ok(&self) -> bool {
        matches!(
            self.detail,
            Detail::StatusChanged { new_status: MoabStatus::Ok, .. }
        )
    }
}

#[derive(Serialize)]
struct RenderedResult<'a> {
    code: &'static str,
    message: &'a str,
}

/// Ordered, append-only findings for one
/// `(druid, observed version, storage root, check name)` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditResults {
    pub druid: String,
    pub actual_version: Option<i32>,
    pub storage_root: String,
    pub check_name: String,
    results: Vec<AuditResult>,
}

impl AuditResults {
    pub fn new(
        druid: impl Into<String>,
        actual_version: Option<i32>,
        storage_root: impl Into<String>,
        check_name: impl Into<String>,
    ) -> Self {
        Self {
            druid: druid.into(),
            actual_version,
            storage_root: storage_root.into(),
            check_name: check_name.into(),
            results: Vec::new(),
        }
    }

    pub fn add(&mut self, detail: Detail) {
        self.results.push(AuditResult::new(detail));
    }

    /// Strip every result claiming a persisted write. Called after a rollback.
    pub fn remove_mutation_results(&mut self) {
        self.results.retain(|r| !r.code().implies_mutation());
    }

    pub fn contains(&self, code: ResultCode) -> bool {
        self.results.iter().any(|r| r.code() == code)
    }

    pub fn count(&self, code: ResultCode) -> usize {
        self.results.iter().filter(|r| r.code() == code).count()
    }

    /// Everything except status transitions to `ok`.
    pub fn errors(&self) -> Vec<&AuditResult> {
        self.results
            .iter()
            .filter(|r| !r.is_status_changed_to_ok())
            .collect()
    }

    /// Status transitions to `ok`.
    pub fn completed(&self) -> Vec<&AuditResult> {
        self.results
            .iter()
            .filter(|r| r.is_status_changed_to_ok())
            .collect()
    }

    pub fn results(&self) -> &[AuditResult] {
        &self.results
    }

    pub fn codes(&self) -> Vec<ResultCode> {
        self.results.iter().map(AuditResult::code).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Serialized form written to `status_details`: a JSON array of
    /// `{"code": .., "message": ..}` objects in insertion order.
    pub fn to_status_details(&self) -> String {
        let rendered: Vec<RenderedResult<'_>> = self
            .results
            .iter()
            .map(|r| RenderedResult {
                code: r.code().as_str(),
                message: &r.message,
            })
            .collect();
        // Serializing &str pairs cannot fail.
        serde_json::to_string(&rendered).unwrap_or_default()
    }
}
