//! Unused-key guard.
//!
//! [`CatalogConfig`](crate::CatalogConfig) ignores keys it does not know, so
//! a misspelled `allow_content_subdir` would silently fall back to the
//! default. Callers run [`report_unused_keys`] on the merged document and
//! decide whether leftovers are warnings or errors.
//!
//! Consumed pointers are JSON Pointer prefixes: `/storage_roots` consumes
//! `/storage_roots/0/name`, but `/moab/allow` would not consume `/moab/allowed`.

use crate::collect_leaf_pointers;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Every pointer the typed config reads.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/storage_roots",
    "/moab/allow_content_subdirs",
    "/reporting/log",
    "/reporting/workflow/base_url",
    "/reporting/error_tracker/endpoint",
    "/reporting/audit_trail/path",
    "/reporting/audit_trail/hash_chain",
    "/database/max_connections",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Leaf pointers no consumed prefix covers, sorted.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|leaf| !CONSUMED_POINTERS.iter().any(|p| is_prefix_pointer(p, leaf)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        unused_leaf_pointers: unused,
    };
    if report.is_clean() {
        return Ok(report);
    }

    match policy {
        UnusedKeyPolicy::Warn => {
            warn!(unused = ?report.unused_leaf_pointers, "config keys not read by anything");
            Ok(report)
        }
        UnusedKeyPolicy::Fail => bail!(
            "CONFIG_UNUSED_KEYS count={} keys={}",
            report.unused_leaf_pointers.len(),
            preview_list(&report.unused_leaf_pointers, 10)
        ),
    }
}

/// "/a/b" covers "/a/b" and "/a/b/c" but not "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if leaf == prefix {
        return true;
    }
    leaf.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}

fn preview_list(items: &[String], n: usize) -> String {
    let take: Vec<&String> = items.iter().take(n).collect();
    format!("{:?}", take)
}
