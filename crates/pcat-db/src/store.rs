use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pcat_schemas::{Druid, MoabRecord, MoabStatus, PreservedObject, StorageRoot};
use std::fmt;

/// Failure committing or reading catalog rows.
///
/// `category()` is what ends up in a `persistence_failed` result, so the
/// strings are part of the reporting contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// A uniqueness rule fired (duplicate druid, duplicate record, second primary).
    UniqueViolation {
        constraint: Option<String>,
        message: String,
    },
    /// A guarded update matched no row: someone else moved the version first.
    VersionConflict(String),
    NotFound(String),
    Database(String),
}

impl PersistenceError {
    pub fn category(&self) -> &'static str {
        match self {
            PersistenceError::UniqueViolation { .. } => "unique_violation",
            PersistenceError::VersionConflict(_) => "version_conflict",
            PersistenceError::NotFound(_) => "not_found",
            PersistenceError::Database(_) => "database",
        }
    }

    pub fn message(&self) -> String {
        match self {
            PersistenceError::UniqueViolation { message, .. } => message.clone(),
            PersistenceError::VersionConflict(m)
            | PersistenceError::NotFound(m)
            | PersistenceError::Database(m) => m.clone(),
        }
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category(), self.message())
    }
}

impl std::error::Error for PersistenceError {}

impl From<sqlx::Error> for PersistenceError {
    fn from(e: sqlx::Error) -> Self {
        if crate::is_unique_constraint_violation(&e, None) {
            let constraint = match &e {
                sqlx::Error::Database(db_err) => db_err.constraint().map(str::to_string),
                _ => None,
            };
            return PersistenceError::UniqueViolation {
                constraint,
                message: e.to_string(),
            };
        }
        match e {
            sqlx::Error::RowNotFound => PersistenceError::NotFound("row not found".to_string()),
            other => PersistenceError::Database(other.to_string()),
        }
    }
}

/// Catalog state relevant to one (druid, storage root) pair, read before any
/// decision is made.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    pub object: Option<PreservedObject>,
    pub record: Option<MoabRecord>,
    /// Version held by the object's primary record, if there is one.
    pub primary_version: Option<i32>,
}

/// Insert payload for a moab record. Primary designation is decided by the
/// store: the first record created for an object is primary.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMoabRecord {
    pub storage_root_id: i64,
    pub version: i32,
    pub size: Option<i64>,
    pub status: MoabStatus,
    pub status_details: Option<String>,
    pub last_version_audit: Option<DateTime<Utc>>,
    pub last_moab_validation: Option<DateTime<Utc>>,
    pub last_checksum_validation: Option<DateTime<Utc>>,
}

/// Column changes for an existing record. `None` leaves the column as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordChanges {
    pub version: Option<i32>,
    pub size: Option<i64>,
    pub status: Option<MoabStatus>,
    pub status_details: Option<String>,
    pub last_version_audit: Option<DateTime<Utc>>,
    pub last_moab_validation: Option<DateTime<Utc>>,
    pub last_checksum_validation: Option<DateTime<Utc>>,
}

impl RecordChanges {
    pub fn is_empty(&self) -> bool {
        *self == RecordChanges::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogWrite {
    CreateObject {
        druid: Druid,
        current_version: i32,
    },
    CreateRecord {
        druid: Druid,
        record: NewMoabRecord,
    },
    /// Applies only while the record still holds `expected_version`.
    UpdateRecord {
        record_id: i64,
        expected_version: i32,
        changes: RecordChanges,
    },
    /// Applies only while the object still holds `expected_current_version`
    /// and `new_version` is greater.
    AdvanceObjectVersion {
        druid: Druid,
        expected_current_version: i32,
        new_version: i32,
    },
}

/// Writes applied atomically: all of them or none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<CatalogWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: CatalogWrite) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[CatalogWrite] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<CatalogWrite> {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn storage_root(&self, name: &str) -> Result<Option<StorageRoot>, PersistenceError>;

    async fn storage_roots(&self) -> Result<Vec<StorageRoot>, PersistenceError>;

    /// Insert or update a storage root by name.
    async fn ensure_storage_root(
        &self,
        name: &str,
        storage_location: &str,
    ) -> Result<StorageRoot, PersistenceError>;

    async fn load(
        &self,
        druid: &Druid,
        storage_root_id: i64,
    ) -> Result<CatalogSnapshot, PersistenceError>;

    /// Apply every write in one transaction; on the first failure nothing is kept.
    async fn commit(&self, batch: WriteBatch) -> Result<(), PersistenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_stable() {
        let u = PersistenceError::UniqueViolation {
            constraint: Some("uq_preserved_objects_druid".into()),
            message: "duplicate key".into(),
        };
        assert_eq!(u.category(), "unique_violation");
        assert_eq!(PersistenceError::VersionConflict("x".into()).category(), "version_conflict");
        assert_eq!(PersistenceError::NotFound("x".into()).category(), "not_found");
        assert_eq!(PersistenceError::Database("x".into()).category(), "database");
        assert_eq!(u.to_string(), "unique_violation: duplicate key");
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let e: PersistenceError = sqlx::Error::RowNotFound.into();
        assert_eq!(e.category(), "not_found");
    }

    #[test]
    fn empty_changes_detected() {
        assert!(RecordChanges::default().is_empty());
        let c = RecordChanges {
            version: Some(2),
            ..Default::default()
        };
        assert!(!c.is_empty());
    }
}
