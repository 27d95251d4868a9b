use pcat_schemas::is_valid_druid;
use serde::{Deserialize, Serialize};

/// Observed version as handed in by a caller: either a number or the
/// version directory name (`v0006`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncomingVersion {
    Number(i64),
    Name(String),
}

impl IncomingVersion {
    /// Positive version number, or `None` if the value cannot be one.
    pub fn parse(&self) -> Option<i32> {
        let n = match self {
            IncomingVersion::Number(n) => *n,
            IncomingVersion::Name(s) => {
                let s = s.trim();
                let digits = s.strip_prefix(|c: char| c.is_ascii_alphabetic()).unwrap_or(s);
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.trim_start_matches('0').parse::<i64>().unwrap_or(0)
            }
        };
        i32::try_from(n).ok().filter(|v| *v > 0)
    }
}

impl From<i32> for IncomingVersion {
    fn from(v: i32) -> Self {
        IncomingVersion::Number(i64::from(v))
    }
}

impl From<&str> for IncomingVersion {
    fn from(s: &str) -> Self {
        IncomingVersion::Name(s.to_string())
    }
}

/// What a caller observed on one storage root for one druid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRequest {
    pub druid: String,
    pub incoming_version: IncomingVersion,
    pub incoming_size: Option<i64>,
    pub storage_root: String,
}

impl AuditRequest {
    pub fn new(
        druid: impl Into<String>,
        incoming_version: impl Into<IncomingVersion>,
        incoming_size: Option<i64>,
        storage_root: impl Into<String>,
    ) -> Self {
        Self {
            druid: druid.into(),
            incoming_version: incoming_version.into(),
            incoming_size,
            storage_root: storage_root.into(),
        }
    }
}

pub(crate) const DRUID_INVALID: &str = "Druid is invalid";
pub(crate) const VERSION_INVALID: &str = "Incoming version must be an integer greater than 0";
pub(crate) const SIZE_INVALID: &str = "Incoming size must be an integer greater than 0";
pub(crate) const STORAGE_ROOT_INVALID: &str = "Storage root must be an actual StorageRoot";

/// Checks that need no catalog access. Every violation is listed.
pub(crate) fn argument_errors(
    druid: &str,
    version: Option<&IncomingVersion>,
    size: Option<i64>,
) -> Vec<String> {
    let mut errors = Vec::new();
    if !is_valid_druid(druid) {
        errors.push(DRUID_INVALID.to_string());
    }
    if let Some(v) = version {
        if v.parse().is_none() {
            errors.push(VERSION_INVALID.to_string());
        }
    }
    if matches!(size, Some(s) if s <= 0) {
        errors.push(SIZE_INVALID.to_string());
    }
    errors
}
