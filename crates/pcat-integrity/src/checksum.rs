use pcat_moab::manifest::{list_files, version_dir_name};
use pcat_moab::{compute_signature, FileCategory, ManifestReadError, MoabVersion, ObservedMoab};
use pcat_results::{AuditResults, Detail, ResultCode};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

/// What a checksum pass concluded. Findings themselves live in the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumOutcome {
    /// Object path absent; nothing else was checked.
    NotFound,
    /// Every manifest and catalog entry matched; `checksum_valid` was added.
    Passed,
    /// At least one content or manifest finding was added.
    Failed { findings: usize },
}

impl ChecksumOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, ChecksumOutcome::Passed)
    }
}

/// Read-only content-integrity check of one observed moab.
///
/// Recomputes file signatures and compares them to every version's manifest
/// inventory and to the latest signature catalog, then looks for files on disk
/// that were never cataloged. Only appends to `results`; never touches the
/// catalog, so it must be run outside any database transaction.
///
/// A file flagged for the same reason by both the manifest inventory and the
/// signature catalog is reported once.
pub struct ChecksumValidator<'a> {
    moab: &'a dyn ObservedMoab,
    reported: BTreeSet<(ResultCode, String)>,
}

impl<'a> ChecksumValidator<'a> {
    pub fn new(moab: &'a dyn ObservedMoab) -> Self {
        Self {
            moab,
            reported: BTreeSet::new(),
        }
    }

    pub fn validate(mut self, results: &mut AuditResults) -> ChecksumOutcome {
        if !self.moab.exists() {
            results.add(Detail::MoabNotFound {
                object_path: self.moab.object_path().display().to_string(),
            });
            return ChecksumOutcome::NotFound;
        }

        let before = results.len();

        let versions = match self.moab.versions() {
            Ok(v) => v,
            Err(e) => {
                warn!(druid = %self.moab.druid(), error = %e, "unable to enumerate versions");
                Vec::new()
            }
        };

        for version in &versions {
            self.validate_manifest_inventory(version.as_ref(), results);
        }

        if let Some(cataloged) = self.validate_signature_catalog(results) {
            self.find_uncataloged_files(&versions, &cataloged, results);
        }

        let findings = results.len() - before;
        if findings == 0 {
            results.add(Detail::ChecksumValid);
            debug!(druid = %self.moab.druid(), "checksum validation passed");
            ChecksumOutcome::Passed
        } else {
            ChecksumOutcome::Failed { findings }
        }
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(self.moab.object_path())
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn report_once(&mut self, results: &mut AuditResults, file_path: &str, detail: Detail) {
        if self.reported.insert((detail.code(), file_path.to_string())) {
            results.add(detail);
        }
    }

    fn validate_manifest_inventory(
        &mut self,
        version: &dyn MoabVersion,
        results: &mut AuditResults,
    ) {
        let vname = version.version_name();
        let manifest_file_path = self.relative(&version.manifest_path());

        let diff = match version.verify_manifest_inventory() {
            Ok(d) => d,
            Err(ManifestReadError::Missing(_)) => {
                results.add(Detail::ManifestNotInMoab { manifest_file_path });
                return;
            }
            Err(ManifestReadError::Unreadable { reason, .. }) => {
                warn!(
                    druid = %self.moab.druid(),
                    version = %vname,
                    %reason,
                    "manifest inventory unreadable"
                );
                results.add(Detail::InvalidManifest { manifest_file_path });
                return;
            }
        };

        for rel in diff.modified {
            let file_path = format!("{vname}/{rel}");
            let detail = Detail::ChecksumMismatch {
                file_path: file_path.clone(),
                version: vname.clone(),
            };
            self.report_once(results, &file_path, detail);
        }
        for rel in diff.added {
            let file_path = format!("{vname}/{rel}");
            let detail = Detail::FileNotInManifest {
                file_path: file_path.clone(),
                manifest_file_path: manifest_file_path.clone(),
            };
            self.report_once(results, &file_path, detail);
        }
        for rel in diff.deleted {
            let file_path = format!("{vname}/{rel}");
            let detail = Detail::FileNotInMoab {
                file_path: file_path.clone(),
                manifest_file_path: manifest_file_path.clone(),
            };
            self.report_once(results, &file_path, detail);
        }
    }

    /// Returns the set of cataloged storage paths, or `None` when the catalog
    /// could not be read (in which case the orphan scan is skipped).
    fn validate_signature_catalog(
        &mut self,
        results: &mut AuditResults,
    ) -> Option<BTreeSet<String>> {
        let catalog_path = self.relative(&self.moab.signature_catalog_path());

        let catalog = match self.moab.latest_signature_catalog() {
            Ok(c) => c,
            Err(ManifestReadError::Missing(_)) => {
                results.add(Detail::SignatureCatalogNotInMoab {
                    signature_catalog_path: catalog_path,
                });
                return None;
            }
            Err(ManifestReadError::Unreadable { reason, .. }) => {
                warn!(druid = %self.moab.druid(), %reason, "signature catalog unreadable");
                results.add(Detail::InvalidManifest {
                    manifest_file_path: catalog_path,
                });
                return None;
            }
        };

        let mut cataloged = BTreeSet::new();
        for entry in &catalog.entries {
            let file_path = entry.storage_path();
            cataloged.insert(file_path.clone());

            let abs = self.moab.object_path().join(&file_path);
            if !abs.is_file() {
                let detail = Detail::FileNotInMoab {
                    file_path: file_path.clone(),
                    manifest_file_path: catalog_path.clone(),
                };
                self.report_once(results, &file_path, detail);
                continue;
            }

            let matches = match compute_signature(&abs) {
                Ok(sig) => sig == entry.signature,
                Err(e) => {
                    warn!(path = %abs.display(), error = %e, "unable to read file for signature");
                    false
                }
            };
            if !matches {
                let detail = Detail::ChecksumMismatch {
                    file_path: file_path.clone(),
                    version: version_dir_name(entry.version_id),
                };
                self.report_once(results, &file_path, detail);
            }
        }
        Some(cataloged)
    }

    fn find_uncataloged_files(
        &mut self,
        versions: &[Box<dyn MoabVersion>],
        cataloged: &BTreeSet<String>,
        results: &mut AuditResults,
    ) {
        for version in versions {
            for category in [FileCategory::Content, FileCategory::Metadata] {
                let dir = version.file_category_path(category);
                let files = match list_files(&dir) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!(path = %dir.display(), error = %e, "unable to list directory");
                        continue;
                    }
                };
                for rel in files {
                    let file_path = self.relative(&dir.join(&rel));
                    if !cataloged.contains(&file_path) {
                        let detail = Detail::FileNotInSignatureCatalog {
                            file_path: file_path.clone(),
                        };
                        self.report_once(results, &file_path, detail);
                    }
                }
            }
        }
    }
}

/// Convenience wrapper around [`ChecksumValidator`].
pub fn validate_checksums(moab: &dyn ObservedMoab, results: &mut AuditResults) -> ChecksumOutcome {
    ChecksumValidator::new(moab).validate(results)
}
