use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single field value carried by a [`Record`].
///
/// Serialized untagged so records read and write as plain JSON objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

impl FieldValue {
    /// Borrow the value as text, if it is a string field.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::UInt(u64::from(v))
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::UInt(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

/// One telemetry data point: a measurement name, tags, and named fields.
///
/// Field and tag maps are ordered so serialized output is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.add_field(key, value);
        self
    }

    pub fn with_timestamp(mut self, ts: i64) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Look up a field by name.
    #[inline]
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    #[inline]
    pub fn has_field(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Add a field, replacing any existing value with the same name.
    #[inline]
    pub fn add_field(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_field_overwrites() {
        let mut r = Record::new("conn").with_field("country", "DE");
        r.add_field("country", "US");
        assert_eq!(r.field("country"), Some(&FieldValue::from("US")));
        assert_eq!(r.fields().len(), 1);
    }

    #[test]
    fn json_shape() {
        let r = Record::new("conn")
            .with_tag("host", "edge1")
            .with_field("ip", "8.8.8.8")
            .with_field("lat", 37.386)
            .with_field("asn", 15169u32)
            .with_timestamp(1_700_000_000);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(
            json,
            r#"{"name":"conn","tags":{"host":"edge1"},"fields":{"asn":15169,"ip":"8.8.8.8","lat":37.386},"timestamp":1700000000}"#
        );
    }

    #[test]
    fn untagged_values_parse_by_shape() {
        let r: Record = serde_json::from_str(
            r#"{"name":"m","fields":{"a":true,"b":-3,"c":18446744073709551615,"d":1.5,"e":"x"}}"#,
        )
        .unwrap();
        assert_eq!(r.field("a"), Some(&FieldValue::Bool(true)));
        assert_eq!(r.field("b"), Some(&FieldValue::Int(-3)));
        assert_eq!(r.field("c"), Some(&FieldValue::UInt(u64::MAX)));
        assert_eq!(r.field("d"), Some(&FieldValue::Float(1.5)));
        assert_eq!(r.field("e").and_then(FieldValue::as_str), Some("x"));
        assert!(r.tags().is_empty());
        assert_eq!(r.timestamp, None);
    }
}
