//! Firestore REST API types.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Firestore document value types used by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // Firestore sends integers as strings
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
}

/// Firestore document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// Server update time, doubles as the optimistic concurrency token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// Create a new document with the given fields.
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    /// Decode a field, `None` if missing or of another type.
    pub fn get<T: FromFirestoreValue>(&self, field: &str) -> Option<T> {
        self.fields.get(field).and_then(T::from_firestore_value)
    }
}

/// Convert a Rust value to a Firestore value.
pub trait ToFirestoreValue {
    fn to_firestore_value(&self) -> Value;
}

impl ToFirestoreValue for String {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.clone())
    }
}

impl ToFirestoreValue for &str {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue((*self).to_string())
    }
}

impl ToFirestoreValue for i64 {
    fn to_firestore_value(&self) -> Value {
        Value::IntegerValue(self.to_string())
    }
}

impl ToFirestoreValue for bool {
    fn to_firestore_value(&self) -> Value {
        Value::BooleanValue(*self)
    }
}

impl ToFirestoreValue for DateTime<Utc> {
    fn to_firestore_value(&self) -> Value {
        Value::TimestampValue(self.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

impl<T: ToFirestoreValue> ToFirestoreValue for Option<T> {
    fn to_firestore_value(&self) -> Value {
        match self {
            Some(v) => v.to_firestore_value(),
            None => Value::NullValue(()),
        }
    }
}

/// Convert a Firestore value to a Rust type.
pub trait FromFirestoreValue: Sized {
    fn from_firestore_value(value: &Value) -> Option<Self>;
}

impl FromFirestoreValue for String {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::StringValue(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromFirestoreValue for i64 {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::IntegerValue(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl FromFirestoreValue for bool {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::BooleanValue(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromFirestoreValue for DateTime<Utc> {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::TimestampValue(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.into()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_wire_format() {
        let json = serde_json::to_value(Value::StringValue("x".into())).unwrap();
        assert_eq!(json, serde_json::json!({"stringValue": "x"}));

        let json = serde_json::to_value(Option::<String>::None.to_firestore_value()).unwrap();
        assert_eq!(json, serde_json::json!({"nullValue": null}));

        let parsed: Value = serde_json::from_value(serde_json::json!({"integerValue": "42"})).unwrap();
        assert_eq!(i64::from_firestore_value(&parsed), Some(42));
    }

    #[test]
    fn test_document_parse() {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "name": "projects/p/databases/(default)/documents/videos/abc",
            "fields": {
                "title": {"stringValue": "Boots"},
                "video_url": {"nullValue": null},
                "created_at": {"timestampValue": "2024-05-01T12:00:00.123456Z"}
            },
            "updateTime": "2024-05-01T12:00:01.000001Z"
        }))
        .unwrap();

        assert_eq!(doc.get::<String>("title").as_deref(), Some("Boots"));
        assert_eq!(doc.get::<String>("video_url"), None);
        assert!(doc.get::<DateTime<Utc>>("created_at").is_some());
        assert_eq!(doc.update_time.as_deref(), Some("2024-05-01T12:00:01.000001Z"));
    }
}
