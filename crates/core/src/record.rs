//! Typed records: schema-validated maps from field name to value.
//!
//! Validation happens on write. Every successful [`TypedRecord::set`]
//! leaves the record in a state where each stored value's type is
//! acceptable for its field, so downstream consumers (validators,
//! serializers, pipeline stages) never re-check types.

use crate::schema::Schema;
use crate::value::Value;
use crate::{GleanerError, Result};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A record whose stored values always match their field declarations.
///
/// # Example
///
/// ```rust
/// use gleaner_core::{FieldSpec, Schema, TypedRecord, Value};
///
/// let schema = Schema::builder("page").field(FieldSpec::text("title")).build();
/// let mut record = TypedRecord::new(schema);
/// record.set("title", Value::from("Hello")).unwrap();
/// assert_eq!(record.get("title").and_then(|v| v.as_text()), Some("Hello"));
/// ```
#[derive(Debug, Clone)]
pub struct TypedRecord {
    schema: Arc<Schema>,
    values: BTreeMap<String, Value>,
}

impl TypedRecord {
    /// Creates an empty record of the given type.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema, values: BTreeMap::new() }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stored entries, ordered by field name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Stores `value` under `field` after validation and coercion.
    ///
    /// - `Null` is stored as-is: fields may be legitimately empty.
    /// - A value whose type is already acceptable is stored unchanged.
    /// - Otherwise the field's coercion runs; a coercion returning empty
    ///   stores `Null`, and a coerced value is re-checked against the
    ///   declared types before being stored.
    ///
    /// Fails with [`GleanerError::TypeMismatch`] when no coercion is
    /// declared or the coercion produced yet another unacceptable type
    /// (a bug in the coercer). Assignment is all-or-nothing: on error
    /// the record is unchanged.
    pub fn set(&mut self, field: &str, value: Value) -> Result<()> {
        let Some(spec) = self.schema.field(field) else {
            return Err(GleanerError::UnknownField {
                schema: self.schema.name().to_string(),
                field: field.to_string(),
            });
        };

        let Some(actual) = value.field_type() else {
            self.values.insert(field.to_string(), Value::Null);
            return Ok(());
        };

        if spec.accepts(actual) {
            self.values.insert(field.to_string(), value);
            return Ok(());
        }

        let Some(coerce) = spec.coerce else {
            return Err(GleanerError::TypeMismatch {
                field: field.to_string(),
                expected: spec.expected_display(),
                actual: actual.to_string(),
            });
        };

        let coerced = coerce(&value).unwrap_or(Value::Null);
        match coerced.field_type() {
            None => {
                self.values.insert(field.to_string(), Value::Null);
                Ok(())
            }
            Some(coerced_type) if spec.accepts(coerced_type) => {
                self.values.insert(field.to_string(), coerced);
                Ok(())
            }
            Some(coerced_type) => Err(GleanerError::TypeMismatch {
                field: field.to_string(),
                expected: spec.expected_display(),
                actual: coerced_type.to_string(),
            }),
        }
    }

    /// Builds a record from a raw JSON map.
    ///
    /// Missing, null, and empty-string raw values are skipped. Each
    /// remaining value goes through direct assignment first; on a type
    /// mismatch the field's fallback parser runs on the raw value and
    /// its output is assigned instead. A mismatch on a field without a
    /// parser, or a second failure after parsing, is an error: those are
    /// schema configuration bugs, not recoverable conditions.
    ///
    /// `required` flags are deliberately not enforced here; completeness
    /// is a separate concern from well-typedness and is checked by
    /// [`validate_required`](crate::validate_required) once construction
    /// is done.
    pub fn parse(schema: Arc<Schema>, raw: &Map<String, Json>) -> Result<TypedRecord> {
        let mut record = TypedRecord::new(Arc::clone(&schema));

        for spec in schema.fields() {
            let Some(json) = raw.get(spec.name()) else { continue };
            if json.is_null() || json.as_str().is_some_and(str::is_empty) {
                continue;
            }

            match record.set(spec.name(), Value::from_json(json)) {
                Ok(()) => {}
                Err(mismatch @ GleanerError::TypeMismatch { .. }) => match spec.parser {
                    Some(parser) => {
                        let parsed = parser(json).map_err(|reason| GleanerError::FieldParse {
                            field: spec.name().to_string(),
                            reason,
                        })?;
                        record.set(spec.name(), parsed)?;
                    }
                    None => return Err(mismatch),
                },
                Err(err) => return Err(err),
            }
        }

        Ok(record)
    }

    /// Builds a record keeping only declared, truthy entries of `raw`.
    ///
    /// Used to strip noise (unknown keys, empty strings, nulls) before
    /// feeding scraped data into [`parse`](Self::parse) or assembling a
    /// record directly. Values still go through [`set`](Self::set), so a
    /// declared-but-mistyped entry is an error rather than being
    /// silently retained.
    pub fn clean(schema: Arc<Schema>, raw: &Map<String, Json>) -> Result<TypedRecord> {
        let mut record = TypedRecord::new(Arc::clone(&schema));

        for spec in schema.fields() {
            if let Some(json) = raw.get(spec.name()) {
                let value = Value::from_json(json);
                if value.is_truthy() {
                    record.set(spec.name(), value)?;
                }
            }
        }

        Ok(record)
    }

    /// Serializes the record for export.
    ///
    /// Per stored field, the output pipeline runs first (a step returning
    /// `None` drops the field from the output), then the field's
    /// serializer, defaulting to the plain JSON mapping. Fields appear in
    /// schema declaration order.
    pub fn to_json(&self) -> Json {
        let mut map = Map::new();

        'fields: for spec in self.schema.fields() {
            let Some(stored) = self.values.get(spec.name()) else { continue };

            let mut value = stored.clone();
            for step in &spec.output {
                match step(value) {
                    Some(next) => value = next,
                    None => continue 'fields,
                }
            }

            let json = match spec.serializer {
                Some(serialize) => serialize(&value),
                None => value.to_json(),
            };
            map.insert(spec.name().to_string(), json);
        }

        Json::Object(map)
    }
}

impl PartialEq for TypedRecord {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name() && self.values == other.values
    }
}

impl Serialize for TypedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
