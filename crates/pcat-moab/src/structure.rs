use crate::manifest::{
    parse_version_dir_name, version_dir_name, DATA_DIR, MANIFESTS_DIR, MANIFEST_INVENTORY,
    SIGNATURE_CATALOG,
};
use crate::ObservedMoab;
use std::fs;
use std::path::Path;

/// Structural validator collaborator. An empty list means the layout is valid.
pub trait StructureValidator: Send + Sync {
    fn validate(&self, moab: &dyn ObservedMoab, allow_content_subdirs: bool) -> Vec<String>;
}

/// Checks the on-disk layout of a moab without reading file contents.
///
/// Rules:
/// - object root holds only `vNNNN` directories, numbered 1..=n without gaps
/// - each version holds only `manifests/` and (optionally) `data/`
/// - `manifests/` holds both the manifest inventory and signature catalog
/// - `data/` holds only `content/` and `metadata/`
/// - `data/content/` holds no subdirectories unless allowed
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutValidator;

impl StructureValidator for LayoutValidator {
    fn validate(&self, moab: &dyn ObservedMoab, allow_content_subdirs: bool) -> Vec<String> {
        let root = moab.object_path();
        let mut errors = Vec::new();

        let names = match dir_names(root) {
            Ok(n) => n,
            Err(_) => {
                errors.push(format!("Moab not found at {}", root.display()));
                return errors;
            }
        };

        let mut version_ids = Vec::new();
        for (name, is_dir) in &names {
            if !is_dir {
                errors.push(format!(
                    "Moab root should contain only version directories: found file {name}"
                ));
                continue;
            }
            match parse_version_dir_name(name) {
                Some(v) => version_ids.push(v),
                None => {
                    errors.push(format!("Version directory name not in 'v00xx' format: {name}"))
                }
            }
        }

        version_ids.sort_unstable();
        if version_ids.is_empty() {
            errors.push("Moab contains no version directories".to_string());
        } else if version_ids.iter().enumerate().any(|(i, v)| *v != i as i32 + 1) {
            let dirs: Vec<String> = version_ids.iter().map(|v| version_dir_name(*v)).collect();
            errors.push(format!(
                "Should contain only sequential version directories. Current directories: {dirs:?}"
            ));
        }

        for v in version_ids {
            validate_version(
                &root.join(version_dir_name(v)),
                v,
                allow_content_subdirs,
                &mut errors,
            );
        }

        errors
    }
}

fn validate_version(vdir: &Path, v: i32, allow_content_subdirs: bool, errors: &mut Vec<String>) {
    let vname = version_dir_name(v);

    let entries = match dir_names(vdir) {
        Ok(e) => e,
        Err(e) => {
            errors.push(format!("Version {vname}: unable to list directory: {e}"));
            return;
        }
    };
    for (name, _) in &entries {
        if name != MANIFESTS_DIR && name != DATA_DIR {
            errors.push(format!(
                "Version {vname}: version directory should only contain manifests and data, found {name}"
            ));
        }
    }

    let manifests = vdir.join(MANIFESTS_DIR);
    if !manifests.is_dir() {
        errors.push(format!("Version {vname}: Missing directory: {MANIFESTS_DIR}"));
    } else {
        for required in [MANIFEST_INVENTORY, SIGNATURE_CATALOG] {
            if !manifests.join(required).is_file() {
                errors.push(format!("Version {vname}: Missing file {required} in {MANIFESTS_DIR}"));
            }
        }
    }

    let data = vdir.join(DATA_DIR);
    if !data.is_dir() {
        return;
    }
    if let Ok(children) = dir_names(&data) {
        for (name, is_dir) in children {
            if !is_dir || (name != "content" && name != "metadata") {
                errors.push(format!(
                    "Version {vname}: data directory should only contain content and metadata, found {name}"
                ));
            }
        }
    }

    if !allow_content_subdirs {
        if let Ok(children) = dir_names(&data.join("content")) {
            if children.iter().any(|(_, is_dir)| *is_dir) {
                errors.push(format!(
                    "Version {vname}: content directory should only contain files, not directories"
                ));
            }
        }
    }
}

fn dir_names(dir: &Path) -> std::io::Result<Vec<(String, bool)>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        out.push((
            entry.file_name().to_string_lossy().into_owned(),
            entry.file_type()?.is_dir(),
        ));
    }
    out.sort();
    Ok(out)
}
