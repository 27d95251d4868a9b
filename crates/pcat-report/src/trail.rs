use crate::{ReportContext, Reporter};
use anyhow::anyhow;
use async_trait::async_trait;
use pcat_audit::{AuditWriter, EventScope};
use pcat_results::{AuditResult, Severity};
use serde_json::json;
use std::sync::Mutex;

pub const EVENT_AUDIT_ERROR: &str = "AUDIT_ERROR";
pub const EVENT_AUDIT_COMPLETED: &str = "AUDIT_COMPLETED";

/// Records warn/error results and completions in the append-only event trail.
pub struct AuditTrailReporter {
    writer: Mutex<AuditWriter>,
}

impl AuditTrailReporter {
    pub fn new(writer: AuditWriter) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    fn append(
        &self,
        ctx: &ReportContext,
        event_type: &str,
        result: &AuditResult,
    ) -> anyhow::Result<()> {
        let scope = EventScope {
            druid: ctx.druid.clone(),
            version: ctx.version,
            storage_root: ctx.storage_root.clone(),
            check_name: ctx.check_name.clone(),
        };
        let payload = json!({
            "code": result.code().as_str(),
            "message": result.message,
        });
        let mut w = self
            .writer
            .lock()
            .map_err(|_| anyhow!("audit trail writer poisoned"))?;
        w.append(&scope, event_type, payload)?;
        Ok(())
    }
}

#[async_trait]
impl Reporter for AuditTrailReporter {
    fn name(&self) -> &'static str {
        "audit_trail"
    }

    async fn report_errors(
        &self,
        ctx: &ReportContext,
        results: &[&AuditResult],
    ) -> anyhow::Result<()> {
        for r in results.iter().filter(|r| r.code().severity() >= Severity::Warn) {
            self.append(ctx, EVENT_AUDIT_ERROR, r)?;
        }
        Ok(())
    }

    async fn report_completed(
        &self,
        ctx: &ReportContext,
        result: &AuditResult,
    ) -> anyhow::Result<()> {
        self.append(ctx, EVENT_AUDIT_COMPLETED, result)
    }
}
