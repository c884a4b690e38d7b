//! Field declarations and per-record-type schemas.
//!
//! A [`Schema`] is a static table of [`FieldSpec`] declarations, built
//! once per record type and shared behind an `Arc`. Record instances
//! hold only their values plus a reference to their schema; all typing
//! rules live here.

use crate::value::{FieldType, Value};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::Arc;

/// Transformation step applied to values entering or leaving a record.
///
/// Returning `None` drops the value.
pub type Processor = fn(Value) -> Option<Value>;

/// Converts a mistyped value into one of the field's declared types.
///
/// Returning `None` means the value coerces to empty, which is stored as
/// [`Value::Null`].
pub type Coerce = fn(&Value) -> Option<Value>;

/// Fallback parser for raw values direct coercion cannot handle, e.g. a
/// JSON-encoded list inside a string. The error reason is reported as a
/// field parse failure.
pub type Parser = fn(&Json) -> std::result::Result<Value, String>;

/// Custom export serializer for a stored value.
pub type Serializer = fn(&Value) -> Json;

/// Declaration of a single record field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub(crate) name: String,
    pub(crate) expected: Vec<FieldType>,
    pub(crate) required: bool,
    pub(crate) coerce: Option<Coerce>,
    pub(crate) parser: Option<Parser>,
    pub(crate) input: Vec<Processor>,
    pub(crate) output: Vec<Processor>,
    pub(crate) serializer: Option<Serializer>,
}

impl FieldSpec {
    /// Declares a field with one expected type.
    pub fn new(name: impl Into<String>, expected: FieldType) -> Self {
        Self {
            name: name.into(),
            expected: vec![expected],
            required: false,
            coerce: None,
            parser: None,
            input: Vec::new(),
            output: Vec::new(),
            serializer: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::DateTime)
    }

    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::List)
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Object)
    }

    /// Accepts an additional type; the first declared type stays canonical.
    pub fn or_type(mut self, expected: FieldType) -> Self {
        if !self.expected.contains(&expected) {
            self.expected.push(expected);
        }
        self
    }

    /// Marks the field as required for validation.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the coercion applied when an assigned value's type mismatches.
    pub fn coerce(mut self, coerce: Coerce) -> Self {
        self.coerce = Some(coerce);
        self
    }

    /// Sets the fallback parser used during bulk parse.
    pub fn parser(mut self, parser: Parser) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Sets the input pipeline run by loaders on every added value.
    pub fn input(mut self, steps: &[Processor]) -> Self {
        self.input = steps.to_vec();
        self
    }

    /// Sets the output pipeline run when the record is serialized.
    pub fn output(mut self, steps: &[Processor]) -> Self {
        self.output = steps.to_vec();
        self
    }

    /// Sets the export serializer for the stored value.
    pub fn serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Acceptable types in declaration order; the first is canonical.
    pub fn expected_types(&self) -> &[FieldType] {
        &self.expected
    }

    pub fn canonical_type(&self) -> FieldType {
        self.expected[0]
    }

    pub(crate) fn accepts(&self, field_type: FieldType) -> bool {
        self.expected.contains(&field_type)
    }

    pub(crate) fn expected_display(&self) -> String {
        let names: Vec<String> = self.expected.iter().map(ToString::to_string).collect();
        names.join(" | ")
    }
}

/// Named table of field declarations for one record type.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    order: Vec<String>,
    fields: HashMap<String, FieldSpec>,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder { name: name.into(), order: Vec::new(), fields: HashMap::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Field declarations in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.order.iter().filter_map(|name| self.fields.get(name))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    order: Vec<String>,
    fields: HashMap<String, FieldSpec>,
}

impl SchemaBuilder {
    /// Adds a field declaration; redeclaring a name replaces the earlier
    /// spec in place, keeping its original position.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        let name = spec.name.clone();
        if self.fields.insert(name.clone(), spec).is_none() {
            self.order.push(name);
        }
        self
    }

    /// Copies every field declaration from an existing schema.
    pub fn extend(mut self, schema: &Schema) -> Self {
        for spec in schema.fields() {
            self = self.field(spec.clone());
        }
        self
    }

    /// Builds the shared schema.
    pub fn build(self) -> Arc<Schema> {
        Arc::new(Schema { name: self.name, order: self.order, fields: self.fields })
    }
}
