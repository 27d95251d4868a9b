use pcat_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

const YAML_WITH_TYPO: &str = r#"
storage_roots:
  - name: "sr1"
    storage_location: "/sr1"
moab:
  allow_content_subdir: false
reporting:
  audit_trail:
    path: "/tmp/audit.jsonl"
    rotate: daily
"#;

#[test]
fn warn_mode_reports_unused_keys_without_error() {
    let loaded = load_layered_yaml_from_strings(&[YAML_WITH_TYPO]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn mode must not error");

    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/moab/allow_content_subdir".to_string(),
            "/reporting/audit_trail/rotate".to_string(),
        ]
    );
}

#[test]
fn typo_silently_falls_back_to_default_in_typed_view() {
    let loaded = load_layered_yaml_from_strings(&[YAML_WITH_TYPO]).unwrap();
    let cfg = loaded.catalog().unwrap();
    assert!(cfg.moab.allow_content_subdirs);
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&[YAML_WITH_TYPO]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail)
        .unwrap_err()
        .to_string();
    assert!(err.contains("CONFIG_UNUSED_KEYS count=2"), "{err}");
}

#[test]
fn fully_consumed_config_is_clean_in_fail_mode() {
    let yaml = r#"
storage_roots:
  - name: "sr1"
    storage_location: "/sr1"
moab:
  allow_content_subdirs: false
reporting:
  log: true
  workflow:
    base_url: "http://localhost:3001"
  error_tracker:
    endpoint: "http://localhost:3002/notices"
  audit_trail:
    path: "/tmp/audit.jsonl"
    hash_chain: false
database:
  max_connections: 3
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}
