use assert_cmd::Command;
use pcat_audit::{AuditWriter, EventScope};
use predicates::prelude::*;
use serde_json::json;
use std::fs;

fn write_trail(path: &std::path::Path) -> anyhow::Result<()> {
    let scope = EventScope {
        druid: "bj102hs9687".to_string(),
        version: Some(3),
        storage_root: "sr1".to_string(),
        check_name: "validate_checksums".to_string(),
    };
    let mut w = AuditWriter::new(path, true)?;
    w.append(&scope, "AUDIT_ERROR", json!({ "code": "does_not_exist" }))?;
    w.append(&scope, "AUDIT_ERROR", json!({ "code": "checksum_mismatch" }))?;
    Ok(())
}

#[test]
fn trail_verify_accepts_intact_chain() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("audit.jsonl");
    write_trail(&path)?;

    Command::cargo_bin("pcat")?
        .args(["trail", "verify"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("trail_valid=true lines=2"));
    Ok(())
}

#[test]
fn trail_verify_fails_on_edited_line() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("audit.jsonl");
    write_trail(&path)?;

    let edited = fs::read_to_string(&path)?.replace("checksum_mismatch", "version_matches");
    fs::write(&path, edited)?;

    Command::cargo_bin("pcat")?
        .args(["trail", "verify"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("trail_valid=false line=2"))
        .stderr(predicate::str::contains("hash_self mismatch"));
    Ok(())
}
