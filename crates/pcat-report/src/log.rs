use crate::{ReportContext, Reporter};
use async_trait::async_trait;
use pcat_results::{AuditResult, Severity};
use tracing::{debug, error, info, warn};

/// Structured log line per result, at the code's fixed severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

fn emit(severity: Severity, ctx: &ReportContext, result: &AuditResult) {
    let code = result.code().as_str();
    let message = result.message.as_str();
    match severity {
        Severity::Debug => debug!(
            druid = %ctx.druid, version = ?ctx.version, storage_root = %ctx.storage_root,
            check_name = %ctx.check_name, code, "{message}"
        ),
        Severity::Info => info!(
            druid = %ctx.druid, version = ?ctx.version, storage_root = %ctx.storage_root,
            check_name = %ctx.check_name, code, "{message}"
        ),
        Severity::Warn => warn!(
            druid = %ctx.druid, version = ?ctx.version, storage_root = %ctx.storage_root,
            check_name = %ctx.check_name, code, "{message}"
        ),
        Severity::Error => error!(
            druid = %ctx.druid, version = ?ctx.version, storage_root = %ctx.storage_root,
            check_name = %ctx.check_name, code, "{message}"
        ),
    }
}

#[async_trait]
impl Reporter for LogReporter {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn report_errors(
        &self,
        ctx: &ReportContext,
        results: &[&AuditResult],
    ) -> anyhow::Result<()> {
        for r in results {
            emit(r.code().severity(), ctx, r);
        }
        Ok(())
    }

    async fn report_completed(
        &self,
        ctx: &ReportContext,
        result: &AuditResult,
    ) -> anyhow::Result<()> {
        emit(Severity::Info, ctx, result);
        Ok(())
    }
}
