//! pcat-integrity
//!
//! Content-integrity checks and status derivation for catalog records.
//!
//! - [`ChecksumValidator`]: recomputes file signatures against manifest
//!   inventories and the signature catalog. Read-only; never run inside a
//!   database transaction.
//! - [`derive_status`]: pure mapping from gathered signals to a [`MoabStatus`],
//!   recording `status_changed` / `unable_to_check_status` as it goes.
//!
//! [`MoabStatus`]: pcat_schemas::MoabStatus

mod checksum;
mod status;

pub use checksum::{validate_checksums, ChecksumOutcome, ChecksumValidator};
pub use status::{derive_status, status_for, transition, StatusInputs};
