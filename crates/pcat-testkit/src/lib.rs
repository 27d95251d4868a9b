//! pcat-testkit
//!
//! Test support: an in-memory catalog store with fault injection, a
//! recording report sink, and a one-call world builder that wires a fixture
//! moab to a storage root. Scenario tests live under `tests/`.

mod reporter;
mod store;

pub use pcat_moab::fixture::MoabFixture;
pub use reporter::{RecordingReporter, ReportCall};
pub use store::MemoryCatalogStore;

use pcat_schemas::StorageRoot;
use std::sync::Arc;

pub const FIXTURE_ROOT: &str = "fixture_sr1";

/// A fixture moab plus a store that knows its storage root.
pub struct World {
    pub store: Arc<MemoryCatalogStore>,
    pub moab: MoabFixture,
    pub root: StorageRoot,
}

impl World {
    pub fn new(druid: &str) -> Self {
        let moab = MoabFixture::new(druid);
        let store = Arc::new(MemoryCatalogStore::new());
        let location = moab.storage_location().to_string_lossy().to_string();
        let root = store.add_storage_root(FIXTURE_ROOT, &location);
        Self { store, moab, root }
    }

    /// Adds `n` small versions to the moab.
    pub fn with_versions(mut self, n: usize) -> Self {
        for _ in 0..n {
            self.add_version();
        }
        self
    }

    /// Adds one small version; returns its id.
    pub fn add_version(&mut self) -> i32 {
        let next = self.moab.latest_version() + 1;
        let page = format!("content/page{next}.txt");
        let content = format!("content of version {next}");
        let metadata = format!("<versionMetadata version=\"{next}\"/>");
        self.moab.add_version(&[
            (page.as_str(), content.as_bytes()),
            ("metadata/versionMetadata.xml", metadata.as_bytes()),
        ])
    }
}
