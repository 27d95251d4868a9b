use crate::{ReportContext, Reporter};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use pcat_results::AuditResult;
use serde::Serialize;
use tracing::debug;

/// Posts one notice per error-tracker-reportable result to an HTTP endpoint.
///
/// Endpoint credentials belong in the URL's environment, never in config.
#[derive(Debug, Clone)]
pub struct ErrorTrackerReporter {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct Notice<'a> {
    error_class: String,
    message: String,
    context: NoticeContext<'a>,
}

#[derive(Debug, Serialize)]
struct NoticeContext<'a> {
    druid: &'a str,
    version: Option<i32>,
    storage_root: &'a str,
    check_name: &'a str,
    code: &'static str,
}

impl ErrorTrackerReporter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    fn notice<'a>(ctx: &'a ReportContext, result: &AuditResult) -> Notice<'a> {
        Notice {
            error_class: format!("{} {}", ctx.check_name, result.code()),
            message: format!(
                "{} || {} || {} || {}",
                ctx.druid,
                ctx.storage_root,
                ctx.check_name,
                result.message
            ),
            context: NoticeContext {
                druid: &ctx.druid,
                version: ctx.version,
                storage_root: &ctx.storage_root,
                check_name: &ctx.check_name,
                code: result.code().as_str(),
            },
        }
    }
}

#[async_trait]
impl Reporter for ErrorTrackerReporter {
    fn name(&self) -> &'static str {
        "error_tracker"
    }

    async fn report_errors(
        &self,
        ctx: &ReportContext,
        results: &[&AuditResult],
    ) -> anyhow::Result<()> {
        for r in results.iter().filter(|r| r.code().is_error_tracker_reportable()) {
            let resp = self
                .http
                .post(&self.endpoint)
                .json(&Self::notice(ctx, r))
                .send()
                .await
                .context("error tracker request failed")?;

            let status = resp.status();
            if !status.is_success() {
                return Err(anyhow!("error tracker http error status={}", status.as_u16()));
            }
            debug!(druid = %ctx.druid, code = %r.code(), "error tracker notified");
        }
        Ok(())
    }

    async fn report_completed(
        &self,
        _ctx: &ReportContext,
        _result: &AuditResult,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}
