//! Command handlers for the `pcat` binary.
//!
//! Shared wiring (config loading, engine + sink construction) lives here;
//! command-specific logic lives in the submodules.

pub mod audit;
pub mod db;

use anyhow::{Context, Result};
use pcat_audit::AuditWriter;
use pcat_config::{report_unused_keys, CatalogConfig, UnusedKeyPolicy};
use pcat_db::PgCatalogStore;
use pcat_reconcile::{ReconcileConfig, Reconciler};
use pcat_report::{
    AuditTrailReporter, ErrorTrackerReporter, HttpWorkflowClient, LogReporter, ResultsDispatcher,
    WorkflowReporter,
};
use std::sync::Arc;
use tracing::info;

pub struct LoadedCatalog {
    pub catalog: CatalogConfig,
    /// `None` when no config files were given and defaults are in effect.
    pub config_hash: Option<String>,
}

/// Load and validate layered config. No paths means defaults.
pub fn load_config(paths: &[String]) -> Result<LoadedCatalog> {
    if paths.is_empty() {
        return Ok(LoadedCatalog {
            catalog: CatalogConfig::default(),
            config_hash: None,
        });
    }

    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = pcat_config::load_layered_yaml(&path_refs)?;
    report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    let catalog = loaded.catalog()?;
    info!(config_hash = %loaded.config_hash, "config loaded");

    Ok(LoadedCatalog {
        catalog,
        config_hash: Some(loaded.config_hash),
    })
}

/// Everything an audit invocation needs.
pub struct Engine {
    pub reconciler: Reconciler,
    pub dispatcher: ResultsDispatcher,
    pub config_hash: Option<String>,
}

impl Engine {
    pub async fn connect(cfg: &LoadedCatalog) -> Result<Self> {
        let pool = pcat_db::connect_from_env_with(cfg.catalog.database.max_connections).await?;
        let store = Arc::new(PgCatalogStore::new(pool));
        let reconciler = Reconciler::new(
            store,
            ReconcileConfig {
                allow_content_subdirs: cfg.catalog.moab.allow_content_subdirs,
            },
        );
        Ok(Self {
            reconciler,
            dispatcher: build_dispatcher(&cfg.catalog)?,
            config_hash: cfg.config_hash.clone(),
        })
    }
}

/// One sink per enabled `reporting` section.
pub fn build_dispatcher(cfg: &CatalogConfig) -> Result<ResultsDispatcher> {
    let mut dispatcher = ResultsDispatcher::new();
    let reporting = &cfg.reporting;

    if reporting.log {
        dispatcher.register(Arc::new(LogReporter));
    }
    if let Some(wf) = &reporting.workflow {
        let client = HttpWorkflowClient::new_with_base_url(wf.base_url.clone());
        dispatcher.register(Arc::new(WorkflowReporter::new(client)));
    }
    if let Some(et) = &reporting.error_tracker {
        dispatcher.register(Arc::new(ErrorTrackerReporter::new(et.endpoint.clone())));
    }
    if let Some(trail) = &reporting.audit_trail {
        let writer = AuditWriter::resume(&trail.path, trail.hash_chain)
            .with_context(|| format!("open audit trail {}", trail.path))?;
        dispatcher.register(Arc::new(AuditTrailReporter::new(writer)));
    }

    Ok(dispatcher)
}
