use crate::manifest::{
    inventoried_files, list_files, parse_version_dir_name, read_json, version_dir_name,
    ManifestInventory, SignatureCatalog, MANIFESTS_DIR, MANIFEST_INVENTORY, SIGNATURE_CATALOG,
};
use crate::signature::compute_signature;
use crate::{ManifestReadError, ManifestVerification, MoabError, MoabVersion, ObservedMoab};
use pcat_schemas::{Druid, FileSignature};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A moab laid out in a druid tree under a storage location:
/// `<storage_location>/bj/102/hs/9687/bj102hs9687/v0001/...`
#[derive(Debug, Clone)]
pub struct DirMoab {
    druid: Druid,
    object_path: PathBuf,
}

impl DirMoab {
    pub fn new(storage_location: impl AsRef<Path>, druid: Druid) -> Self {
        let mut object_path = storage_location.as_ref().to_path_buf();
        for seg in druid.tree() {
            object_path.push(seg);
        }
        Self { druid, object_path }
    }

    fn io_err(&self, e: io::Error) -> MoabError {
        if e.kind() == io::ErrorKind::NotFound {
            MoabError::NotFound(self.object_path.clone())
        } else {
            MoabError::Io {
                path: self.object_path.clone(),
                message: e.to_string(),
            }
        }
    }

    fn version_dirs(&self) -> Result<Vec<DirVersion>, MoabError> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.object_path).map_err(|e| self.io_err(e))? {
            let entry = entry.map_err(|e| self.io_err(e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(version_id) = parse_version_dir_name(&name) {
                out.push(DirVersion {
                    version_id,
                    path: entry.path(),
                });
            }
        }
        out.sort_by_key(|v| v.version_id);
        Ok(out)
    }
}

impl ObservedMoab for DirMoab {
    fn druid(&self) -> &Druid {
        &self.druid
    }

    fn object_path(&self) -> &Path {
        &self.object_path
    }

    fn current_version(&self) -> Result<i32, MoabError> {
        self.version_dirs()?
            .last()
            .map(|v| v.version_id)
            .ok_or_else(|| MoabError::Malformed("no version directories".to_string()))
    }

    fn size(&self) -> Result<i64, MoabError> {
        if !self.exists() {
            return Err(MoabError::NotFound(self.object_path.clone()));
        }
        let mut total: u64 = 0;
        for rel in list_files(&self.object_path).map_err(|e| self.io_err(e))? {
            let md = fs::metadata(self.object_path.join(&rel)).map_err(|e| self.io_err(e))?;
            total += md.len();
        }
        Ok(total as i64)
    }

    fn versions(&self) -> Result<Vec<Box<dyn MoabVersion>>, MoabError> {
        Ok(self
            .version_dirs()?
            .into_iter()
            .map(|v| Box::new(v) as Box<dyn MoabVersion>)
            .collect())
    }

    fn signature_catalog_path(&self) -> PathBuf {
        let latest = self.current_version().unwrap_or(1);
        self.object_path
            .join(version_dir_name(latest))
            .join(MANIFESTS_DIR)
            .join(SIGNATURE_CATALOG)
    }

    fn latest_signature_catalog(&self) -> Result<SignatureCatalog, ManifestReadError> {
        read_json(&self.signature_catalog_path())
    }
}

/// One `vNNNN` directory of a [`DirMoab`].
#[derive(Debug, Clone)]
pub struct DirVersion {
    version_id: i32,
    path: PathBuf,
}

impl MoabVersion for DirVersion {
    fn version_id(&self) -> i32 {
        self.version_id
    }

    fn version_path(&self) -> &Path {
        &self.path
    }

    fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFESTS_DIR).join(MANIFEST_INVENTORY)
    }

    fn verify_manifest_inventory(&self) -> Result<ManifestVerification, ManifestReadError> {
        let manifest_path = self.manifest_path();
        let inventory: ManifestInventory = read_json(&manifest_path)?;

        let on_disk = inventoried_files(&self.path).map_err(|e| ManifestReadError::Unreadable {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let mut expected: BTreeMap<String, FileSignature> = inventory
            .files
            .into_iter()
            .map(|f| (f.path, f.signature))
            .collect();

        let mut result = ManifestVerification::default();
        for rel in on_disk {
            match expected.remove(&rel) {
                None => result.added.push(rel),
                Some(want) => match compute_signature(&self.path.join(&rel)) {
                    Ok(got) if got == want => {}
                    Ok(_) => result.modified.push(rel),
                    Err(e) => {
                        warn!(
                            path = %self.path.join(&rel).display(),
                            error = %e,
                            "unable to read file for signature"
                        );
                        result.modified.push(rel);
                    }
                },
            }
        }
        result.deleted = expected.into_keys().collect();

        result.modified.sort();
        result.added.sort();
        Ok(result)
    }
}
