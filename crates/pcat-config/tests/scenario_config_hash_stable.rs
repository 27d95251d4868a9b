//! Config hashes are deterministic: same content, same hash, regardless of
//! key order in the source YAML; any value change moves the hash.

use pcat_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
storage_roots:
  - name: "services-disk01"
    storage_location: "/services-disk01/sdr2objects"
  - name: "services-disk02"
    storage_location: "/services-disk02/sdr2objects"
moab:
  allow_content_subdirs: true
database:
  max_connections: 5
"#;

const BASE_YAML_REORDERED: &str = r#"
database:
  max_connections: 5
moab:
  allow_content_subdirs: true
storage_roots:
  - storage_location: "/services-disk01/sdr2objects"
    name: "services-disk01"
  - storage_location: "/services-disk02/sdr2objects"
    name: "services-disk02"
"#;

const OVERLAY_YAML: &str = r#"
moab:
  allow_content_subdirs: false
database:
  max_connections: 20
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(original.config_hash, reordered.config_hash);
    assert_eq!(original.canonical_json, reordered.canonical_json);
}

#[test]
fn reordered_list_items_change_the_hash() {
    let swapped = r#"
storage_roots:
  - name: "services-disk02"
    storage_location: "/services-disk02/sdr2objects"
  - name: "services-disk01"
    storage_location: "/services-disk01/sdr2objects"
moab:
  allow_content_subdirs: true
database:
  max_connections: 5
"#;
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[swapped]).unwrap();
    assert_ne!(a.config_hash, b.config_hash, "list order is content");
}

#[test]
fn merged_layers_take_effect_and_hash_stably() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);

    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_ne!(a.config_hash, base.config_hash);

    let cfg = a.catalog().unwrap();
    assert!(!cfg.moab.allow_content_subdirs);
    assert_eq!(cfg.database.max_connections, 20);
    assert_eq!(cfg.storage_roots.len(), 2, "overlay without storage_roots keeps the base list");
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn layered_files_match_layered_strings() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let overlay = dir.path().join("prod.yaml");
    std::fs::write(&base, BASE_YAML).unwrap();
    std::fs::write(&overlay, OVERLAY_YAML).unwrap();

    let from_files = pcat_config::load_layered_yaml(&[
        base.to_str().unwrap(),
        overlay.to_str().unwrap(),
    ])
    .unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(from_files.config_hash, from_strings.config_hash);
}

#[test]
fn missing_file_names_the_path() {
    let err = pcat_config::load_layered_yaml(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.yaml"));
}
