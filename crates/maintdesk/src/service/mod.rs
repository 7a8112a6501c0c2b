//! Entity services: payload validation, reference checks and business rules
//! on top of the repositories.
//!
//! Every function takes the shared [`Database`](crate::db::Database) handle
//! and is synchronous; callers on an async runtime should run them on a
//! blocking thread.

pub mod locations;
pub mod machines;
pub mod operations;
pub mod ranges;
pub mod work_orders;

use crate::error::{MaintError, Result};

/// Fails with a validation error listing every id in `wanted` that `found`
/// does not contain.
pub(crate) fn ensure_all_found(kind: &str, wanted: &[String], found: &[String]) -> Result<()> {
    let missing: Vec<&str> = wanted
        .iter()
        .filter(|id| !found.contains(id))
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(MaintError::invalid(format!(
        "Unknown {}: {}",
        kind,
        missing.join(", ")
    )))
}
