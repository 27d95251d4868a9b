//! pcat-moab
//!
//! Read-only view of what is physically present on a storage root for one
//! druid ("observed moab"), plus the structural validator.
//!
//! The engine consumes the [`ObservedMoab`] / [`MoabVersion`] traits and the
//! [`StructureValidator`] trait; [`DirMoab`] and [`LayoutValidator`] are the
//! directory-backed implementations.
//!
//! Nothing in this crate writes to the catalog.

mod dir;
#[cfg(feature = "testkit")]
pub mod fixture;
pub mod manifest;
mod signature;
mod structure;

pub use dir::{DirMoab, DirVersion};
pub use manifest::{
    ManifestEntry, ManifestInventory, SignatureCatalog, SignatureCatalogEntry,
};
pub use signature::compute_signature;
pub use structure::{LayoutValidator, StructureValidator};

use pcat_schemas::Druid;
use std::fmt;
use std::path::{Path, PathBuf};

/// Subdirectories of a version that hold files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Content,
    Metadata,
    Manifests,
}

impl FileCategory {
    pub fn rel_path(&self) -> &'static str {
        match self {
            FileCategory::Content => "data/content",
            FileCategory::Metadata => "data/metadata",
            FileCategory::Manifests => "manifests",
        }
    }
}

/// Errors reading the moab as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoabError {
    /// The object path does not exist on the storage root.
    NotFound(PathBuf),
    /// Present but not shaped like a moab (e.g. no version directories).
    Malformed(String),
    Io { path: PathBuf, message: String },
}

impl fmt::Display for MoabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoabError::NotFound(p) => write!(f, "moab not found at {}", p.display()),
            MoabError::Malformed(msg) => write!(f, "malformed moab: {msg}"),
            MoabError::Io { path, message } => {
                write!(f, "io error at {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for MoabError {}

/// Errors reading a manifest inventory or signature catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestReadError {
    Missing(PathBuf),
    Unreadable { path: PathBuf, reason: String },
}

impl fmt::Display for ManifestReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestReadError::Missing(p) => write!(f, "{} not found", p.display()),
            ManifestReadError::Unreadable { path, reason } => {
                write!(f, "unable to parse {}: {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for ManifestReadError {}

/// Outcome of diffing a version's files against its manifest inventory.
/// Paths are relative to the version directory and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestVerification {
    /// In both, signature differs.
    pub modified: Vec<String>,
    /// On disk, not in the manifest.
    pub added: Vec<String>,
    /// In the manifest, not on disk.
    pub deleted: Vec<String>,
}

impl ManifestVerification {
    pub fn is_verified(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.deleted.is_empty()
    }
}

/// One stored version directory.
pub trait MoabVersion: Send + Sync {
    fn version_id(&self) -> i32;

    fn version_name(&self) -> String {
        manifest::version_dir_name(self.version_id())
    }

    fn version_path(&self) -> &Path;

    /// Location of the manifest inventory, for messages.
    fn manifest_path(&self) -> PathBuf;

    /// Recompute signatures and diff against the manifest inventory.
    fn verify_manifest_inventory(&self) -> Result<ManifestVerification, ManifestReadError>;

    fn file_category_path(&self, category: FileCategory) -> PathBuf {
        self.version_path().join(category.rel_path())
    }
}

/// What is physically present for one druid on one storage root.
pub trait ObservedMoab: Send + Sync {
    fn druid(&self) -> &Druid;

    fn object_path(&self) -> &Path;

    fn exists(&self) -> bool {
        self.object_path().is_dir()
    }

    fn current_version(&self) -> Result<i32, MoabError>;

    /// Total bytes under the object path.
    fn size(&self) -> Result<i64, MoabError>;

    /// Version directories in ascending order.
    fn versions(&self) -> Result<Vec<Box<dyn MoabVersion>>, MoabError>;

    /// Location of the latest signature catalog, for messages.
    fn signature_catalog_path(&self) -> PathBuf;

    fn latest_signature_catalog(&self) -> Result<SignatureCatalog, ManifestReadError>;
}
