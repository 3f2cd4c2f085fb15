//! Schemaless records.

use crate::record::traits::{Identify, Project};
use crate::types::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record whose body is an arbitrary JSON object.
///
/// `DynamicRecord` lets tooling open any store without the domain type that
/// wrote it. Projection rules:
///
/// - strings project verbatim
/// - numbers and booleans project through `to_string`
/// - `null` and missing keys project to `""`
/// - arrays and objects project to their compact JSON text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DynamicRecord {
    #[serde(skip)]
    id: Option<RecordId>,
    fields: Map<String, Value>,
}

impl DynamicRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON value. Returns `None` unless it is an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { id: None, fields }),
            _ => None,
        }
    }

    /// Sets a field, returning the record for chaining.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Sets a field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Returns a field's raw value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns all fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Converts the record into a JSON object.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl Identify for DynamicRecord {
    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
    }
}

impl Project for DynamicRecord {
    fn project(&self, field: &str) -> Option<String> {
        let text = match self.fields.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => other.to_string(),
        };
        Some(text)
    }
}
