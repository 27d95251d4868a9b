use crate::{summarize, ReportContext, Reporter};
use async_trait::async_trait;
use pcat_results::AuditResult;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

pub const AUDIT_WORKFLOW: &str = "preservationAuditWF";
pub const AUDIT_PROCESS: &str = "preservation-audit";

/// New state for the audit step of an object's workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowUpdate {
    Error { error_msg: String },
    Completed { note: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The workflow does not exist for this object yet.
    NotFound,
    Http { status: u16, body: String },
    Transport(String),
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowError::NotFound => write!(f, "workflow not found"),
            WorkflowError::Http { status, body } => {
                write!(f, "workflow service http error status={status} body={body}")
            }
            WorkflowError::Transport(msg) => write!(f, "workflow service transport error: {msg}"),
        }
    }
}

impl std::error::Error for WorkflowError {}

/// Workflow/orchestration service.
#[async_trait]
pub trait WorkflowClient: Send + Sync {
    async fn update_process(
        &self,
        druid: &str,
        update: &WorkflowUpdate,
    ) -> Result<(), WorkflowError>;

    async fn create_workflow(&self, druid: &str, version: Option<i32>) -> Result<(), WorkflowError>;
}

/// REST client for the workflow service.
///
/// - `PUT  {base}/objects/{druid}/workflows/preservationAuditWF/preservation-audit`
/// - `POST {base}/objects/{druid}/workflows/preservationAuditWF?version={v}`
#[derive(Debug, Clone)]
pub struct HttpWorkflowClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpWorkflowClient {
    pub fn new_with_base_url(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn workflow_url(&self, druid: &str) -> String {
        format!(
            "{}/objects/{}/workflows/{}",
            self.base_url.trim_end_matches('/'),
            druid,
            AUDIT_WORKFLOW
        )
    }

    async fn check(resp: reqwest::Response) -> Result<(), WorkflowError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(WorkflowError::NotFound);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(WorkflowError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl WorkflowClient for HttpWorkflowClient {
    async fn update_process(
        &self,
        druid: &str,
        update: &WorkflowUpdate,
    ) -> Result<(), WorkflowError> {
        let url = format!("{}/{}", self.workflow_url(druid), AUDIT_PROCESS);
        let resp = self
            .http
            .put(url)
            .json(update)
            .send()
            .await
            .map_err(|e| WorkflowError::Transport(e.to_string()))?;
        Self::check(resp).await
    }

    async fn create_workflow(
        &self,
        druid: &str,
        version: Option<i32>,
    ) -> Result<(), WorkflowError> {
        let mut req = self.http.post(self.workflow_url(druid));
        if let Some(v) = version {
            req = req.query(&[("version", v)]);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| WorkflowError::Transport(e.to_string()))?;
        Self::check(resp).await
    }
}

/// Marks the audit step of the object's workflow as errored (for
/// workflow-reportable codes) or completed.
pub struct WorkflowReporter<C> {
    client: C,
}

impl<C: WorkflowClient> WorkflowReporter<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Update; if the workflow is missing, create it and retry exactly once.
    async fn update(
        &self,
        ctx: &ReportContext,
        update: WorkflowUpdate,
    ) -> Result<(), WorkflowError> {
        match self.client.update_process(&ctx.druid, &update).await {
            Err(WorkflowError::NotFound) => {
                info!(druid = %ctx.druid, workflow = AUDIT_WORKFLOW, "workflow missing; creating");
                self.client.create_workflow(&ctx.druid, ctx.version).await?;
                self.client.update_process(&ctx.druid, &update).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl<C: WorkflowClient> Reporter for WorkflowReporter<C> {
    fn name(&self) -> &'static str {
        "workflow"
    }

    async fn report_errors(
        &self,
        ctx: &ReportContext,
        results: &[&AuditResult],
    ) -> anyhow::Result<()> {
        let reportable: Vec<&AuditResult> = results
            .iter()
            .copied()
            .filter(|r| r.code().is_workflow_reportable())
            .collect();
        if reportable.is_empty() {
            return Ok(());
        }

        let error_msg = summarize(ctx, &reportable);
        self.update(ctx, WorkflowUpdate::Error { error_msg }).await?;
        debug!(druid = %ctx.druid, n = reportable.len(), "workflow error status set");
        Ok(())
    }

    async fn report_completed(
        &self,
        ctx: &ReportContext,
        result: &AuditResult,
    ) -> anyhow::Result<()> {
        let note = summarize(ctx, &[result]);
        self.update(ctx, WorkflowUpdate::Completed { note }).await?;
        Ok(())
    }
}
