//! Required-field validation for assembled records.
//!
//! Well-typedness is enforced on write by [`TypedRecord::set`];
//! completeness is checked here as a separate pass, because a record can
//! be well-typed but incomplete while it is still being built up.
//!
//! [`TypedRecord::set`]: crate::TypedRecord::set

use crate::record::TypedRecord;
use crate::{GleanerError, Result};

/// Names of required fields that are absent or empty, in declaration
/// order.
pub fn missing_required(record: &TypedRecord) -> Vec<String> {
    record
        .schema()
        .fields()
        .filter(|spec| spec.is_required())
        .filter(|spec| !record.get(spec.name()).is_some_and(|value| value.is_truthy()))
        .map(|spec| spec.name().to_string())
        .collect()
}

/// Verifies every required field holds a non-empty value.
///
/// The error enumerates each missing field by name; callers drop the
/// record on failure rather than retrying it.
pub fn validate_required(record: &TypedRecord) -> Result<()> {
    let missing = missing_required(record);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(GleanerError::MissingRequiredFields {
            schema: record.schema().name().to_string(),
            missing,
        })
    }
}
