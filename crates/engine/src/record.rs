//! Typed records produced by the block parser.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::payload::path;

/// A typed value captured from a record's lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Bool(b) => Value::Bool(*b),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// One structured event recognized in a worker stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub shape: String,
    pub worker_id: String,
    /// Physical line number of the header line
    pub line_number: usize,
    pub timestamp: Option<String>,
    pub level: Option<String>,
    pub logger: Option<String>,
    pub raw_header: String,
    /// Captured fields in declaration order
    pub fields: Vec<(String, FieldValue)>,
    pub payload: Option<Value>,
}

/// Names [`Record::lookup`] answers before looking at fields or the payload.
pub const BUILTIN_LABELS: &[&str] = &["worker", "shape", "level", "logger", "timestamp", "line_number"];

/// Prefix that forces a lookup straight into the payload.
pub const PAYLOAD_PREFIX: &str = "payload.";

impl Record {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Resolve a name against the record.
    ///
    /// `payload.<path>` resolves only inside the payload. Otherwise built-in
    /// labels come first, then captured fields, then the payload path.
    pub fn lookup(&self, name: &str) -> Option<Cow<'_, Value>> {
        if let Some(rest) = name.strip_prefix(PAYLOAD_PREFIX) {
            return self.payload_lookup(rest);
        }

        let builtin = match name {
            "worker" => Some(Value::String(self.worker_id.clone())),
            "shape" => Some(Value::String(self.shape.clone())),
            "level" => self.level.clone().map(Value::String),
            "logger" => self.logger.clone().map(Value::String),
            "timestamp" => self.timestamp.clone().map(Value::String),
            "line_number" => Some(Value::from(self.line_number as u64)),
            _ => None,
        };
        if let Some(value) = builtin {
            return Some(Cow::Owned(value));
        }

        if let Some(value) = self.field(name) {
            return Some(Cow::Owned(value.to_json()));
        }

        self.payload_lookup(name)
    }

    /// [`Record::lookup`] rendered as display text.
    pub fn lookup_text(&self, name: &str) -> Option<String> {
        self.lookup(name).map(|v| render_value(&v))
    }

    fn payload_lookup(&self, path_str: &str) -> Option<Cow<'_, Value>> {
        self.payload
            .as_ref()
            .and_then(|payload| path::resolve(payload, path_str))
            .filter(|v| !v.is_null())
            .map(Cow::Borrowed)
    }
}

/// Display text of a JSON value: strings unquoted, everything else as JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
