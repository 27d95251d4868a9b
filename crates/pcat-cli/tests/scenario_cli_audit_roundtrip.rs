use assert_cmd::Command;
use pcat_moab::fixture::MoabFixture;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique per run so repeated runs against one database do not collide.
fn fresh_druid() -> anyhow::Result<(String, u128)> {
    let n = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
    Ok((format!("bc{:03}df{:04}", n % 1000, (n / 1000) % 10_000), n))
}

fn pcat(config: &std::path::Path) -> anyhow::Result<Command> {
    let mut cmd = Command::cargo_bin("pcat")?;
    cmd.arg("--config").arg(config);
    Ok(cmd)
}

/// DB-backed; skipped if PCAT_DATABASE_URL is not set.
#[test]
fn cli_create_then_checksum_roundtrip() -> anyhow::Result<()> {
    if std::env::var(pcat_db::ENV_DB_URL).is_err() {
        eprintln!("SKIP: PCAT_DATABASE_URL not set");
        return Ok(());
    }

    let (druid, n) = fresh_druid()?;
    let mut fx = MoabFixture::new(&druid);
    fx.add_version(&[("content/page1.txt", "one".as_bytes())]);
    fx.add_version(&[("content/page2.txt", "two".as_bytes())]);

    let dir = tempfile::tempdir()?;
    let trail = dir.path().join("audit.jsonl");
    let root_name = format!("cli_root_{n}");
    let config = dir.path().join("pcat.yaml");
    fs::write(
        &config,
        format!(
            "storage_roots:\n  - name: \"{root_name}\"\n    storage_location: \"{}\"\nreporting:\n  audit_trail:\n    path: \"{}\"\n",
            fx.storage_location().display(),
            trail.display()
        ),
    )?;

    Command::cargo_bin("pcat")?
        .args(["db", "migrate"])
        .assert()
        .success();

    let out = pcat(&config)?.args(["db", "sync-roots"]).output()?;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8(out.stdout)?.contains(&format!("name={root_name}")));

    let out = pcat(&config)?
        .args(["audit", "check-existence", "--druid", &druid])
        .args(["--storage-root", &root_name, "--version", "v0002", "--size", "6"])
        .output()?;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout)?;
    assert!(stdout.contains("check_name=check_existence"), "{stdout}");
    assert!(stdout.contains("result code=does_not_exist severity=warn"), "{stdout}");
    assert!(stdout.contains("result code=created severity=info"), "{stdout}");

    let out = pcat(&config)?
        .args(["audit", "checksum", "--druid", &druid, "--storage-root", &root_name])
        .output()?;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout)?;
    assert!(stdout.contains("result code=checksum_valid"), "{stdout}");
    assert!(stdout.contains("result code=status_changed"), "{stdout}");
    assert!(!stdout.contains("failed_sinks="), "{stdout}");

    Command::cargo_bin("pcat")?
        .args(["trail", "verify"])
        .arg(&trail)
        .assert()
        .success()
        .stdout(predicates::str::contains("trail_valid=true lines=2"));
    Ok(())
}
