use super::Engine;
use anyhow::{bail, Result};
use pcat_audit::{verify_hash_chain, VerifyResult};
use pcat_reconcile::AuditRequest;
use pcat_results::AuditResults;

/// One engine operation, parsed from the command line.
pub enum AuditCall {
    CheckExistence(AuditRequest),
    Create {
        req: AuditRequest,
        after_validation: bool,
        checksums_validated: bool,
    },
    Update {
        req: AuditRequest,
        after_validation: bool,
        checksums_validated: bool,
    },
    Confirm(AuditRequest),
    CatalogToMoab {
        druid: String,
        storage_root: String,
    },
    Checksum {
        druid: String,
        storage_root: String,
    },
}

pub async fn run(engine: &Engine, call: AuditCall) -> Result<()> {
    let r = &engine.reconciler;
    let results = match call {
        AuditCall::CheckExistence(req) => r.check_existence(&req).await,
        AuditCall::Create {
            req,
            after_validation: true,
            checksums_validated,
        } => r.create_after_validation(&req, checksums_validated).await,
        AuditCall::Create {
            req,
            after_validation: false,
            checksums_validated,
        } => r.create(&req, checksums_validated).await,
        AuditCall::Update {
            req,
            after_validation: true,
            checksums_validated,
        } => r.update_version_after_validation(&req, checksums_validated).await,
        AuditCall::Update {
            req,
            after_validation: false,
            checksums_validated,
        } => r.update_version(&req, checksums_validated).await,
        AuditCall::Confirm(req) => r.confirm_version(&req).await,
        AuditCall::CatalogToMoab {
            druid,
            storage_root,
        } => r.check_catalog_version(&druid, &storage_root).await,
        AuditCall::Checksum {
            druid,
            storage_root,
        } => r.validate_checksums(&druid, &storage_root).await,
    };

    let outcome = engine.dispatcher.dispatch(&results).await;

    print_results(&results, engine.config_hash.as_deref());
    if !outcome.is_clean() {
        println!("failed_sinks={}", outcome.failed.join(","));
    }
    Ok(())
}

fn print_results(results: &AuditResults, config_hash: Option<&str>) {
    println!("check_name={}", results.check_name);
    println!("druid={}", results.druid);
    println!("storage_root={}", results.storage_root);
    println!(
        "actual_version={}",
        results
            .actual_version
            .map(|v| v.to_string())
            .unwrap_or_default()
    );
    if let Some(h) = config_hash {
        println!("config_hash={h}");
    }
    for r in results.results() {
        let code = r.code();
        println!(
            "result code={} severity={} message={:?}",
            code.as_str(),
            code.severity().as_str(),
            r.message
        );
    }
}

/// Prints the verdict; a broken chain is an error exit.
pub fn verify_trail(path: &str) -> Result<()> {
    match verify_hash_chain(path)? {
        VerifyResult::Valid { lines } => {
            println!("trail_valid=true lines={lines} path={path}");
            Ok(())
        }
        VerifyResult::Broken { line, reason } => {
            println!("trail_valid=false line={line} path={path}");
            bail!("audit trail broken at line {line}: {reason}")
        }
    }
}
