//! JSON manifest formats stored under each version's `manifests/` directory.
//!
//! - `manifestInventory.json`: every file in the version directory (except the
//!   inventory itself) with its signature, paths relative to the version dir.
//! - `signatureCatalog.json`: cumulative, de-duplicated index of every unique
//!   signature across versions, each pointing at the one version that stores it.

use crate::signature::compute_signature;
use crate::ManifestReadError;
use pcat_schemas::FileSignature;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

pub const MANIFESTS_DIR: &str = "manifests";
pub const DATA_DIR: &str = "data";
pub const MANIFEST_INVENTORY: &str = "manifestInventory.json";
pub const SIGNATURE_CATALOG: &str = "signatureCatalog.json";

/// `v0003` for 3.
pub fn version_dir_name(version_id: i32) -> String {
    format!("v{version_id:04}")
}

/// Inverse of [`version_dir_name`]: `v0003` -> 3. Rejects anything else.
pub fn parse_version_dir_name(name: &str) -> Option<i32> {
    let digits = name.strip_prefix('v')?;
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i32>().ok().filter(|v| *v > 0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    #[serde(flatten)]
    pub signature: FileSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestInventory {
    pub version_id: i32,
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureCatalogEntry {
    /// Version whose directory physically holds the file.
    pub version_id: i32,
    /// Path relative to that version directory, e.g. `data/content/page1.tif`.
    pub path: String,
    #[serde(flatten)]
    pub signature: FileSignature,
}

impl SignatureCatalogEntry {
    /// Path relative to the object root, e.g. `v0001/data/content/page1.tif`.
    pub fn storage_path(&self) -> String {
        format!("{}/{}", version_dir_name(self.version_id), self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureCatalog {
    pub version_id: i32,
    pub entries: Vec<SignatureCatalogEntry>,
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ManifestReadError> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ManifestReadError::Missing(path.to_path_buf()))
        }
        Err(e) => {
            return Err(ManifestReadError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };
    serde_json::from_str(&raw).map_err(|e| ManifestReadError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    fs::write(path, body)
}

/// All regular files under `dir`, as `/`-joined paths relative to `dir`, sorted.
/// A missing directory yields an empty list.
pub fn list_files(dir: &Path) -> io::Result<Vec<String>> {
    let mut out = Vec::new();
    if !dir.is_dir() {
        return Ok(out);
    }
    for entry in WalkDir::new(dir).min_depth(1).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(dir).map_err(io::Error::other)?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        out.push(parts.join("/"));
    }
    out.sort();
    Ok(out)
}

fn inventory_rel_path() -> String {
    format!("{MANIFESTS_DIR}/{MANIFEST_INVENTORY}")
}

/// Files in a version directory that the manifest inventory is expected to cover.
pub(crate) fn inventoried_files(version_dir: &Path) -> io::Result<Vec<String>> {
    let skip = inventory_rel_path();
    Ok(list_files(version_dir)?
        .into_iter()
        .filter(|p| *p != skip)
        .collect())
}

/// Build an inventory from what is currently on disk in `version_dir`.
pub fn generate_manifest_inventory(
    version_dir: &Path,
    version_id: i32,
) -> io::Result<ManifestInventory> {
    let mut files = Vec::new();
    for rel in inventoried_files(version_dir)? {
        let signature = compute_signature(&version_dir.join(&rel))?;
        files.push(ManifestEntry { path: rel, signature });
    }
    Ok(ManifestInventory { version_id, files })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_dir_names_round_trip() {
        assert_eq!(version_dir_name(6), "v0006");
        assert_eq!(parse_version_dir_name("v0006"), Some(6));
        assert_eq!(parse_version_dir_name("v6"), None);
        assert_eq!(parse_version_dir_name("v0000"), None);
        assert_eq!(parse_version_dir_name("original-v1"), None);
    }

    #[test]
    fn list_files_is_relative_sorted_and_skips_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data/content/sub")).unwrap();
        fs::create_dir_all(dir.path().join("data/metadata")).unwrap();
        fs::write(dir.path().join("data/content/sub/z.txt"), b"z").unwrap();
        fs::write(dir.path().join("data/content/b.txt"), b"b").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();

        assert_eq!(
            list_files(dir.path()).unwrap(),
            vec!["a.txt", "data/content/b.txt", "data/content/sub/z.txt"]
        );
        assert!(list_files(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn generated_inventory_skips_itself() {
        let dir = tempfile::tempdir().unwrap();
        let v1 = dir.path().join("v0001");
        fs::create_dir_all(v1.join("data/content")).unwrap();
        fs::write(v1.join("data/content/a.txt"), b"a").unwrap();
        write_json(
            &v1.join(MANIFESTS_DIR).join(MANIFEST_INVENTORY),
            &ManifestInventory { version_id: 1, files: vec![] },
        )
        .unwrap();

        let inv = generate_manifest_inventory(&v1, 1).unwrap();
        let paths: Vec<&str> = inv.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["data/content/a.txt"]);
    }

    #[test]
    fn read_json_distinguishes_missing_from_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            read_json::<ManifestInventory>(&missing),
            Err(ManifestReadError::Missing(_))
        ));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, b"<xml/>").unwrap();
        assert!(matches!(
            read_json::<ManifestInventory>(&bad),
            Err(ManifestReadError::Unreadable { .. })
        ));
    }
}
