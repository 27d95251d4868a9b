//! pcat-results
//!
//! Audit result accumulator and the result-code taxonomy.
//!
//! Every public reconciliation/validation operation returns an
//! [`AuditResults`]: an ordered list of `(code, rendered message)` pairs
//! scoped to one druid, observed version, storage root and check name.
//! Severity and reporting audience are fixed per [`ResultCode`].
//!
//! Pure data. No IO.

mod codes;
mod results;

pub use codes::{ResultCode, Severity};
pub use results::{AuditResult, AuditResults, Detail, MOAB_RECORD, PRESERVED_OBJECT};
