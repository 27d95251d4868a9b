use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Typed configuration for the audit engine and its operator CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub storage_roots: Vec<StorageRootConfig>,
    #[serde(default)]
    pub moab: MoabConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRootConfig {
    pub name: String,
    pub storage_location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoabConfig {
    /// Whether `data/content` may contain subdirectories. Handed to the
    /// structural validator on every call.
    #[serde(default = "default_true")]
    pub allow_content_subdirs: bool,
}

impl Default for MoabConfig {
    fn default() -> Self {
        Self {
            allow_content_subdirs: true,
        }
    }
}

/// Which sinks the dispatcher gets. The log sink is on unless disabled;
/// the others are on when their section is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingConfig {
    #[serde(default = "default_true")]
    pub log: bool,
    #[serde(default)]
    pub workflow: Option<WorkflowConfig>,
    #[serde(default)]
    pub error_tracker: Option<ErrorTrackerConfig>,
    #[serde(default)]
    pub audit_trail: Option<AuditTrailConfig>,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            log: true,
            workflow: None,
            error_tracker: None,
            audit_trail: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTrackerConfig {
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrailConfig {
    pub path: String,
    #[serde(default = "default_true")]
    pub hash_chain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl CatalogConfig {
    /// Checks serde cannot express. Every problem is listed in one error.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        let mut names = BTreeSet::new();
        for (i, root) in self.storage_roots.iter().enumerate() {
            if root.name.trim().is_empty() {
                problems.push(format!("storage_roots[{i}].name is empty"));
            } else if !names.insert(root.name.as_str()) {
                problems.push(format!("storage_roots[{i}].name '{}' is duplicated", root.name));
            }
            if root.storage_location.trim().is_empty() {
                problems.push(format!("storage_roots[{i}].storage_location is empty"));
            }
        }

        if self.database.max_connections == 0 {
            problems.push("database.max_connections must be greater than 0".to_string());
        }

        if let Some(wf) = &self.reporting.workflow {
            if !is_http_url(&wf.base_url) {
                problems.push(format!(
                    "reporting.workflow.base_url is not an http(s) url: {}",
                    wf.base_url
                ));
            }
        }
        if let Some(et) = &self.reporting.error_tracker {
            if !is_http_url(&et.endpoint) {
                problems.push(format!(
                    "reporting.error_tracker.endpoint is not an http(s) url: {}",
                    et.endpoint
                ));
            }
        }
        if let Some(trail) = &self.reporting.audit_trail {
            if trail.path.trim().is_empty() {
                problems.push("reporting.audit_trail.path is empty".to_string());
            }
        }

        if !problems.is_empty() {
            bail!("CONFIG_INVALID {}", problems.join("; "));
        }
        Ok(())
    }

    pub fn storage_root(&self, name: &str) -> Option<&StorageRootConfig> {
        self.storage_roots.iter().find(|r| r.name == name)
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}
