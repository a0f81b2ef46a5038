use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Raw feature values as the host supplies them.
pub type FeatureMap = BTreeMap<String, Value>;

/// A typed value bound for the output graph. The sink decides how each
/// variant is written (resource or typed literal).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Iri(String),
    Timestamp(DateTime<FixedOffset>),
}

impl PropertyValue {
    /// Converts a non-null feature value. Objects of the form
    /// `{"@id": "..."}` are IRIs; other structured values are kept as
    /// their JSON text.
    pub fn from_feature(value: &Value) -> Option<Self> {
        let converted = match value {
            Value::Null => return None,
            Value::String(s) => PropertyValue::Text(s.clone()),
            Value::Bool(b) => PropertyValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => PropertyValue::Integer(i),
                None => PropertyValue::Double(n.as_f64()?),
            },
            Value::Object(map) => match map.get("@id").and_then(Value::as_str) {
                Some(iri) if map.len() == 1 => PropertyValue::Iri(iri.to_string()),
                _ => PropertyValue::Text(value.to_string()),
            },
            Value::Array(_) => PropertyValue::Text(value.to_string()),
        };
        Some(converted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedProperty {
    pub predicate: String,
    pub value: PropertyValue,
}

/// Property values of one subject, keyed by feature or attribute name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertyMap {
    entries: BTreeMap<String, ExportedProperty>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, predicate: impl Into<String>, value: PropertyValue) {
        self.entries.insert(
            key.into(),
            ExportedProperty {
                predicate: predicate.into(),
                value,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<&ExportedProperty> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExportedProperty)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
