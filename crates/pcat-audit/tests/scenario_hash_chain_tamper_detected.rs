//! Audit trail hash chain
//!
//! GREEN when:
//! - An untampered trail verifies with the right line count.
//! - Editing one payload is detected at that line.
//! - Resuming a trail continues the chain instead of restarting it.

use pcat_audit::{verify_hash_chain, AuditWriter, EventScope, VerifyResult};
use serde_json::json;

fn scope(check_name: &str) -> EventScope {
    EventScope {
        druid: "bj102hs9687".to_string(),
        version: Some(3),
        storage_root: "fixture_sr1".to_string(),
        check_name: check_name.to_string(),
    }
}

fn write_events(writer: &mut AuditWriter, n: usize) {
    for i in 0..n {
        writer
            .append(
                &scope("validate_checksums"),
                "AUDIT_ERROR",
                json!({"index": i, "code": "checksum_mismatch"}),
            )
            .unwrap();
    }
}

#[test]
fn untampered_chain_verifies_valid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trail/audit.jsonl");

    let mut writer = AuditWriter::new(&path, true).unwrap();
    write_events(&mut writer, 5);

    assert_eq!(verify_hash_chain(&path).unwrap(), VerifyResult::Valid { lines: 5 });
}

#[test]
fn tampered_payload_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");

    let mut writer = AuditWriter::new(&path, true).unwrap();
    write_events(&mut writer, 5);

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    lines[2] = lines[2].replace("checksum_mismatch", "checksum_valid");
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();

    match verify_hash_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 3);
            assert!(reason.contains("hash_self mismatch"), "{reason}");
        }
        other => panic!("tampering not detected: {other:?}"),
    }
}

#[test]
fn resumed_writer_continues_the_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");

    {
        let mut writer = AuditWriter::new(&path, true).unwrap();
        write_events(&mut writer, 2);
    }
    {
        let mut writer = AuditWriter::resume(&path, true).unwrap();
        assert_eq!(writer.seq(), 2);
        assert!(writer.last_hash().is_some());
        write_events(&mut writer, 3);
    }

    assert_eq!(verify_hash_chain(&path).unwrap(), VerifyResult::Valid { lines: 5 });
}

#[test]
fn restarting_the_chain_on_an_existing_trail_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");

    {
        let mut writer = AuditWriter::new(&path, true).unwrap();
        write_events(&mut writer, 2);
    }
    {
        let mut writer = AuditWriter::new(&path, true).unwrap();
        write_events(&mut writer, 1);
    }

    assert!(matches!(
        verify_hash_chain(&path).unwrap(),
        VerifyResult::Broken { line: 3, .. }
    ));
}
