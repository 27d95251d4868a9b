//! Tempdir-backed moab builder for tests.
//!
//! Produces the same layout [`DirMoab`] reads: data files, a cumulative
//! signature catalog and a manifest inventory per version. Files whose
//! signature is already cataloged are not stored again.

use crate::manifest::{
    generate_manifest_inventory, version_dir_name, write_json, SignatureCatalog,
    SignatureCatalogEntry, DATA_DIR, MANIFESTS_DIR, MANIFEST_INVENTORY, SIGNATURE_CATALOG,
};
use crate::signature::compute_signature;
use crate::{DirMoab, ObservedMoab};
use pcat_schemas::Druid;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct MoabFixture {
    root: TempDir,
    druid: Druid,
    catalog: SignatureCatalog,
}

impl MoabFixture {
    /// Panics on an invalid druid; fixtures are test-only.
    pub fn new(druid: &str) -> Self {
        let druid = Druid::parse(druid).expect("fixture druid");
        Self {
            root: tempfile::tempdir().expect("fixture tempdir"),
            druid,
            catalog: SignatureCatalog {
                version_id: 0,
                entries: Vec::new(),
            },
        }
    }

    pub fn druid(&self) -> &Druid {
        &self.druid
    }

    pub fn storage_location(&self) -> &Path {
        self.root.path()
    }

    pub fn moab(&self) -> DirMoab {
        DirMoab::new(self.root.path(), self.druid.clone())
    }

    /// Highest version added so far, 0 when empty.
    pub fn latest_version(&self) -> i32 {
        self.catalog.version_id
    }

    pub fn object_path(&self) -> PathBuf {
        self.moab().object_path().to_path_buf()
    }

    /// Add the next version. `files` paths are relative to `data/`,
    /// e.g. `("content/page1.txt", b"...")`. Returns the new version id.
    pub fn add_version(&mut self, files: &[(&str, &[u8])]) -> i32 {
        let version_id = self.catalog.version_id + 1;
        let vdir = self.object_path().join(version_dir_name(version_id));
        fs::create_dir_all(vdir.join(MANIFESTS_DIR)).expect("create manifests dir");

        for (rel, body) in files {
            let data_rel = format!("{DATA_DIR}/{rel}");
            let staged = vdir.join(&data_rel);
            fs::create_dir_all(staged.parent().expect("parent")).expect("create data dir");
            fs::write(&staged, body).expect("write data file");

            let signature = compute_signature(&staged).expect("signature");
            if self.catalog.entries.iter().any(|e| e.signature == signature) {
                fs::remove_file(&staged).expect("dedupe data file");
                continue;
            }
            self.catalog.entries.push(SignatureCatalogEntry {
                version_id,
                path: data_rel,
                signature,
            });
        }

        self.catalog.version_id = version_id;
        write_json(&vdir.join(MANIFESTS_DIR).join(SIGNATURE_CATALOG), &self.catalog)
            .expect("write signature catalog");

        let inventory = generate_manifest_inventory(&vdir, version_id).expect("inventory");
        write_json(&vdir.join(MANIFESTS_DIR).join(MANIFEST_INVENTORY), &inventory)
            .expect("write manifest inventory");

        version_id
    }

    /// Overwrite a file relative to the object root, e.g. `v0002/data/content/a.txt`.
    pub fn write_file(&self, rel: &str, body: &[u8]) {
        let p = self.object_path().join(rel);
        fs::create_dir_all(p.parent().expect("parent")).expect("create dir");
        fs::write(p, body).expect("write file");
    }

    pub fn remove_file(&self, rel: &str) {
        fs::remove_file(self.object_path().join(rel)).expect("remove file");
    }

    pub fn remove_object(&self) {
        fs::remove_dir_all(self.object_path()).expect("remove object");
    }
}
