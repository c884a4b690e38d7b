//! Loaders that accumulate raw values into typed records.
//!
//! Scraped pages yield many candidate values per logical field (a dozen
//! meta tags may carry the title). A [`RecordLoader`] collects them all,
//! runs each through the field's input pipeline, and assembles a record
//! at the end: fields whose canonical type is a list keep every
//! surviving value, all other fields keep the first.

use crate::processors::{collapse_whitespace, normalize_url};
use crate::record::TypedRecord;
use crate::schema::Schema;
use crate::value::{FieldType, Value};
use crate::{GleanerError, Result};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// Accumulates candidate values per field before building a record.
///
/// # Example
///
/// ```rust
/// use gleaner_core::{RecordLoader, Value, webpage_schema};
///
/// let mut loader = RecordLoader::new(webpage_schema());
/// loader.add_text("title_short", "First wins").unwrap();
/// loader.add_text("title_short", "Ignored fallback").unwrap();
///
/// let record = loader.load().unwrap();
/// assert_eq!(record.get("title_short").and_then(Value::as_text), Some("First wins"));
/// ```
#[derive(Debug, Clone)]
pub struct RecordLoader {
    schema: Arc<Schema>,
    base_url: Option<Url>,
    pending: BTreeMap<String, Vec<Value>>,
}

impl RecordLoader {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema, base_url: None, pending: BTreeMap::new() }
    }

    /// Sets the base URL relative links are resolved against.
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base_url = Some(base);
        self
    }

    /// Adds a candidate value, running the field's input pipeline.
    ///
    /// List values are flattened one level, so a whole batch of
    /// candidates can be added at once. Values a pipeline step drops are
    /// discarded silently; assigning to an undeclared field is an error.
    pub fn add_value(&mut self, field: &str, value: Value) -> Result<()> {
        let Some(spec) = self.schema.field(field) else {
            return Err(GleanerError::UnknownField {
                schema: self.schema.name().to_string(),
                field: field.to_string(),
            });
        };

        let candidates = match value {
            Value::List(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };

        let slot = self.pending.entry(field.to_string()).or_default();
        'candidates: for mut candidate in candidates {
            for step in &spec.input {
                match step(candidate) {
                    Some(next) => candidate = next,
                    None => continue 'candidates,
                }
            }
            slot.push(candidate);
        }

        Ok(())
    }

    pub fn add_text(&mut self, field: &str, text: &str) -> Result<()> {
        self.add_value(field, Value::Text(text.to_string()))
    }

    pub fn add_json(&mut self, field: &str, json: &Json) -> Result<()> {
        self.add_value(field, Value::from_json(json))
    }

    /// Adds whatever a JSON pointer finds, if anything.
    ///
    /// Array hits are flattened like any other list candidate, so
    /// `"/author"` over `{"author": [{"name": …}, …]}` contributes each
    /// entry separately.
    pub fn add_pointer(&mut self, field: &str, json: &Json, pointer: &str) -> Result<()> {
        match json.pointer(pointer) {
            Some(found) => self.add_json(field, found),
            None => Ok(()),
        }
    }

    /// Joins a possibly relative URL against the base before adding it.
    ///
    /// Protocol-relative URLs are expanded; blank input is ignored. When
    /// no base is set (or joining fails) the expanded text is added as
    /// given and left to the field's pipeline to validate.
    pub fn add_url(&mut self, field: &str, raw: &str) -> Result<()> {
        let trimmed = collapse_whitespace(raw);
        if trimmed.is_empty() {
            return Ok(());
        }

        let expanded = normalize_url(&trimmed);
        let resolved = match &self.base_url {
            Some(base) => match base.join(&expanded) {
                Ok(url) => url.to_string(),
                Err(_) => expanded,
            },
            None => expanded,
        };

        self.add_value(field, Value::Text(resolved))
    }

    /// Assembles the typed record from the collected values.
    pub fn load(self) -> Result<TypedRecord> {
        let mut record = TypedRecord::new(Arc::clone(&self.schema));

        for (field, values) in self.pending {
            let Some(spec) = self.schema.field(&field) else { continue };
            if values.is_empty() {
                continue;
            }

            if spec.canonical_type() == FieldType::List {
                record.set(&field, Value::List(values))?;
            } else if let Some(first) = values.into_iter().next() {
                record.set(&field, first)?;
            }
        }

        Ok(record)
    }
}
