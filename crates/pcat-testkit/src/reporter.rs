use async_trait::async_trait;
use pcat_report::{ReportContext, Reporter};
use pcat_results::{AuditResult, ResultCode};
use std::sync::Mutex;

/// One call a [`RecordingReporter`] received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportCall {
    Errors { ctx: ReportContext, codes: Vec<ResultCode> },
    Completed { ctx: ReportContext, code: ResultCode },
}

/// Sink that remembers what it was given. Optionally fails every call.
#[derive(Default)]
pub struct RecordingReporter {
    calls: Mutex<Vec<ReportCall>>,
    fail: bool,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ReportCall> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn record(&self, call: ReportCall) -> anyhow::Result<()> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).push(call);
        if self.fail {
            anyhow::bail!("recording reporter configured to fail");
        }
        Ok(())
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn report_errors(
        &self,
        ctx: &ReportContext,
        results: &[&AuditResult],
    ) -> anyhow::Result<()> {
        self.record(ReportCall::Errors {
            ctx: ctx.clone(),
            codes: results.iter().map(|r| r.code()).collect(),
        })
    }

    async fn report_completed(
        &self,
        ctx: &ReportContext,
        result: &AuditResult,
    ) -> anyhow::Result<()> {
        self.record(ReportCall::Completed {
            ctx: ctx.clone(),
            code: result.code(),
        })
    }
}
