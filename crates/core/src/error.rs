//! Error types for record and pipeline operations.
//!
//! This module defines the main error type [`GleanerError`] which covers
//! record field validation, bulk parsing, required-field checks, and
//! pipeline construction.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for record validation and pipeline stages.
///
/// # Example
///
/// ```rust
/// use gleaner_core::{GleanerError, TypedRecord, Value, webpage_schema};
///
/// let mut record = TypedRecord::new(webpage_schema());
/// match record.set("title_full", Value::Integer(42)) {
///     Err(GleanerError::TypeMismatch { field, .. }) => assert_eq!(field, "title_full"),
///     other => panic!("expected a type mismatch, got {:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum GleanerError {
    /// A value's runtime type does not match the field's declared types
    /// and no coercion could produce one that does.
    #[error("field <{field}> requires type {expected} but found type {actual}")]
    TypeMismatch { field: String, expected: String, actual: String },

    /// Assignment to a field the record's schema does not declare.
    #[error("schema <{schema}> does not declare field <{field}>")]
    UnknownField { schema: String, field: String },

    /// A record failed required-field validation.
    ///
    /// Carries every missing field by name so the rejection reason is
    /// actionable. Records failing this check are dropped, not retried.
    #[error("required fields missing {missing:?} from <{schema}> record")]
    MissingRequiredFields { schema: String, missing: Vec<String> },

    /// A fallback parser rejected a raw value during bulk parse.
    #[error("failed to parse field <{field}>: {reason}")]
    FieldParse { field: String, reason: String },

    /// A pipeline stage is missing required settings and cannot run.
    ///
    /// Raised at construction time only; a stage that fails to configure
    /// is disabled for the whole run, never per record.
    #[error("pipeline not configured: {0}")]
    NotConfigured(String),

    /// An image file could not be opened or decoded.
    #[cfg(feature = "blurhash")]
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The BlurHash encoder rejected the prepared pixel data.
    #[cfg(feature = "blurhash")]
    #[error("failed to encode fingerprint for <{path}>: {reason}")]
    FingerprintEncode { path: PathBuf, reason: String },
}

/// Result type alias for [`GleanerError`].
pub type Result<T> = std::result::Result<T, GleanerError>;
