//! pcat-schemas
//!
//! Shared catalog domain types. No IO, no DB access.
//!
//! - [`Druid`]: validated object identifier
//! - [`MoabStatus`]: the closed set of catalog-record states
//! - [`StorageRoot`], [`PreservedObject`], [`MoabRecord`]: persisted row shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Druid
// ---------------------------------------------------------------------------

/// A bare druid (no `druid:` prefix), e.g. `bj102hs9687`.
///
/// Shape: two consonants, three digits, two consonants, four digits. The
/// consonant alphabet excludes vowels and `l`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Druid(String);

impl Druid {
    pub fn parse(s: &str) -> Result<Self, InvalidDruid> {
        if is_valid_druid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidDruid(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments of the druid tree: `bj102hs9687` -> `bj/102/hs/9687/bj102hs9687`.
    pub fn tree(&self) -> [&str; 5] {
        let s = self.0.as_str();
        [&s[0..2], &s[2..5], &s[5..7], &s[7..11], s]
    }
}

impl fmt::Display for Druid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Druid {
    type Error = InvalidDruid;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Druid::parse(&s)
    }
}

impl From<Druid> for String {
    fn from(d: Druid) -> Self {
        d.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDruid(pub String);

impl fmt::Display for InvalidDruid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid druid: {:?}", self.0)
    }
}

impl std::error::Error for InvalidDruid {}

fn is_druid_consonant(c: u8) -> bool {
    matches!(c, b'b'..=b'd' | b'f'..=b'h' | b'j'..=b'k' | b'm'..=b'n' | b'p'..=b't' | b'v'..=b'z')
}

/// Strict druid check used by input validation and by the DB check constraint.
pub fn is_valid_druid(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() != 11 {
        return false;
    }
    is_druid_consonant(b[0])
        && is_druid_consonant(b[1])
        && b[2..5].iter().all(u8::is_ascii_digit)
        && is_druid_consonant(b[5])
        && is_druid_consonant(b[6])
        && b[7..11].iter().all(u8::is_ascii_digit)
}

// ---------------------------------------------------------------------------
// MoabStatus
// ---------------------------------------------------------------------------

/// Catalog's current belief about one stored copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoabStatus {
    Ok,
    InvalidMoab,
    InvalidChecksum,
    ValidityUnknown,
    UnexpectedVersionOnStorage,
    NotFoundOnStorage,
}

impl MoabStatus {
    pub const ALL: [MoabStatus; 6] = [
        MoabStatus::Ok,
        MoabStatus::InvalidMoab,
        MoabStatus::InvalidChecksum,
        MoabStatus::ValidityUnknown,
        MoabStatus::UnexpectedVersionOnStorage,
        MoabStatus::NotFoundOnStorage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoabStatus::Ok => "ok",
            MoabStatus::InvalidMoab => "invalid_moab",
            MoabStatus::InvalidChecksum => "invalid_checksum",
            MoabStatus::ValidityUnknown => "validity_unknown",
            MoabStatus::UnexpectedVersionOnStorage => "unexpected_version_on_storage",
            MoabStatus::NotFoundOnStorage => "not_found_on_storage",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownStatus> {
        MoabStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl fmt::Display for MoabStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown moab status: {:?}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRoot {
    pub id: i64,
    pub name: String,
    pub storage_location: String,
}

/// The logical object: one per druid, carrying the authoritative version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreservedObject {
    pub id: i64,
    pub druid: Druid,
    pub current_version: i32,
}

/// Catalog knowledge of one stored copy of a [`PreservedObject`] on one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoabRecord {
    pub id: i64,
    pub preserved_object_id: i64,
    pub storage_root_id: i64,
    /// Root this copy was migrated from, if any.
    pub previous_storage_root_id: Option<i64>,
    pub version: i32,
    pub size: Option<i64>,
    pub status: MoabStatus,
    pub status_details: Option<String>,
    pub is_primary: bool,
    pub last_version_audit: Option<DateTime<Utc>>,
    pub last_moab_validation: Option<DateTime<Utc>>,
    pub last_checksum_validation: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// Fixity of one file: byte length plus lowercase hex SHA-256.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileSignature {
    pub size: u64,
    pub sha256: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn druid_accepts_strict_shape() {
        let d = Druid::parse("bj102hs9687").unwrap();
        assert_eq!(d.tree(), ["bj", "102", "hs", "9687", "bj102hs9687"]);
    }

    #[test]
    fn druid_rejects_prefix_vowels_and_length() {
        assert!(Druid::parse("druid:bj102hs9687").is_err());
        assert!(Druid::parse("ba102hs9687").is_err());
        assert!(Druid::parse("bl102hs9687").is_err());
        assert!(Druid::parse("bj102hs968").is_err());
        assert!(Druid::parse("").is_err());
    }

    #[test]
    fn status_round_trips_through_str() {
        for st in MoabStatus::ALL {
            assert_eq!(MoabStatus::parse(st.as_str()).unwrap(), st);
        }
        assert!(MoabStatus::parse("online_moab_not_found").is_err());
    }
}
