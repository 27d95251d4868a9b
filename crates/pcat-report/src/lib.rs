//! pcat-report
//!
//! Reporting Dispatcher and its sinks.
//!
//! A finished [`AuditResults`] is fanned out to every registered [`Reporter`]:
//! once with `errors()` through `report_errors`, then once per element of
//! `completed()` through `report_completed`. Sinks are independent. A sink
//! failure is logged and never reaches the accumulator, which is final by
//! the time it is dispatched.

use async_trait::async_trait;
use pcat_results::{AuditResult, AuditResults};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

mod error_tracker;
mod log;
mod trail;
mod workflow;

pub use error_tracker::ErrorTrackerReporter;
pub use log::LogReporter;
pub use trail::AuditTrailReporter;
pub use workflow::{
    HttpWorkflowClient, WorkflowClient, WorkflowError, WorkflowReporter, WorkflowUpdate,
    AUDIT_PROCESS, AUDIT_WORKFLOW,
};

/// The invocation a batch of results belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportContext {
    pub druid: String,
    pub version: Option<i32>,
    pub storage_root: String,
    pub check_name: String,
}

impl ReportContext {
    pub fn from_results(results: &AuditResults) -> Self {
        Self {
            druid: results.druid.clone(),
            version: results.actual_version,
            storage_root: results.storage_root.clone(),
            check_name: results.check_name.clone(),
        }
    }

    fn version_label(&self) -> String {
        self.version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// A reporting sink.
#[async_trait]
pub trait Reporter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called once per dispatch, possibly with an empty slice.
    async fn report_errors(
        &self,
        ctx: &ReportContext,
        results: &[&AuditResult],
    ) -> anyhow::Result<()>;

    async fn report_completed(
        &self,
        ctx: &ReportContext,
        result: &AuditResult,
    ) -> anyhow::Result<()>;
}

/// Sinks whose calls failed during one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub failed: Vec<&'static str>,
}

impl DispatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Default, Clone)]
pub struct ResultsDispatcher {
    reporters: Vec<Arc<dyn Reporter>>,
}

impl ResultsDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn register(&mut self, reporter: Arc<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    pub async fn dispatch(&self, results: &AuditResults) -> DispatchOutcome {
        let ctx = ReportContext::from_results(results);
        let errors = results.errors();
        let completed = results.completed();
        let mut outcome = DispatchOutcome::default();

        for reporter in &self.reporters {
            let mut ok = true;

            if let Err(e) = reporter.report_errors(&ctx, &errors).await {
                warn!(
                    sink = reporter.name(),
                    druid = %ctx.druid,
                    error = %e,
                    "report_errors failed"
                );
                ok = false;
            }
            for result in &completed {
                if let Err(e) = reporter.report_completed(&ctx, result).await {
                    warn!(
                        sink = reporter.name(),
                        druid = %ctx.druid,
                        error = %e,
                        "report_completed failed"
                    );
                    ok = false;
                }
            }

            if !ok {
                outcome.failed.push(reporter.name());
            }
        }
        outcome
    }
}

/// `"<check> (actual location: <root>; actual version: <v>) <msg> && <msg>"`
pub(crate) fn summarize(ctx: &ReportContext, results: &[&AuditResult]) -> String {
    let messages: Vec<&str> = results.iter().map(|r| r.message.as_str()).collect();
    format!(
        "{} (actual location: {}; actual version: {}) {}",
        ctx.check_name,
        ctx.storage_root,
        ctx.version_label(),
        messages.join(" && ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcat_results::Detail;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Counting {
        errors: Mutex<Vec<usize>>,
        completed: Mutex<usize>,
        fail: bool,
    }

    #[async_trait]
    impl Reporter for Counting {
        fn name(&self) -> &'static str {
            if self.fail {
                "failing"
            } else {
                "counting"
            }
        }

        async fn report_errors(
            &self,
            _ctx: &ReportContext,
            results: &[&AuditResult],
        ) -> anyhow::Result<()> {
            self.errors.lock().unwrap().push(results.len());
            if self.fail {
                anyhow::bail!("sink down");
            }
            Ok(())
        }

        async fn report_completed(
            &self,
            _ctx: &ReportContext,
            _result: &AuditResult,
        ) -> anyhow::Result<()> {
            *self.completed.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn results() -> AuditResults {
        let mut r = AuditResults::new("bj102hs9687", Some(2), "fixture_sr1", "confirm_version");
        r.add(Detail::VersionMatches {
            actual_version: 2,
            db_obj_name: pcat_results::MOAB_RECORD,
        });
        r.add(Detail::ChecksumValid);
        r
    }

    #[tokio::test]
    async fn failing_sink_does_not_block_the_next() {
        let failing = Arc::new(Counting {
            fail: true,
            ..Default::default()
        });
        let counting = Arc::new(Counting::default());
        let d = ResultsDispatcher::new()
            .with(failing.clone())
            .with(counting.clone());

        let outcome = d.dispatch(&results()).await;
        assert_eq!(outcome.failed, vec!["failing"]);
        assert_eq!(*counting.errors.lock().unwrap(), vec![2]);
    }

    #[test]
    fn summary_joins_messages() {
        let r = results();
        let ctx = ReportContext::from_results(&r);
        let s = summarize(&ctx, &r.errors());
        assert!(
            s.starts_with("confirm_version (actual location: fixture_sr1; actual version: 2) ")
        );
        assert!(s.contains(" && "));
    }
}
