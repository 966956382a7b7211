use std::time::{SystemTime, UNIX_EPOCH};

use otellogs::logs::{format_time, AnyValue};
use serde::{Serialize, Serializer};

#[derive(Debug, Serialize, Clone, PartialEq)]
pub(crate) enum Value {
    #[serde(rename = "boolValue")]
    Bool(bool),
    #[serde(rename = "intValue")]
    Int(i64),
    #[serde(rename = "doubleValue")]
    Double(f64),
    #[serde(rename = "stringValue")]
    String(String),
    #[serde(rename = "arrayValue")]
    Array(Vec<Value>),
    #[serde(rename = "kvListValue")]
    KeyValues(Vec<KeyValue>),
    #[serde(rename = "bytesValue")]
    BytesValue(Vec<u8>),
    #[serde(rename = "nullValue")]
    Null,
}

impl From<&AnyValue> for Value {
    fn from(value: &AnyValue) -> Self {
        match value {
            AnyValue::Null => Value::Null,
            AnyValue::Boolean(b) => Value::Bool(*b),
            AnyValue::Int(i) => Value::Int(*i),
            AnyValue::Double(d) => Value::Double(*d),
            AnyValue::String(s) => Value::String(s.to_string()),
            AnyValue::Bytes(b) => Value::BytesValue(b.clone()),
            AnyValue::ListAny(list) => Value::Array(list.iter().map(Into::into).collect()),
            AnyValue::Map(entries) => Value::KeyValues(
                entries
                    .iter()
                    .map(|(key, value)| KeyValue::new(key.as_str(), value))
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub(crate) struct KeyValue {
    key: String,
    value: Value,
}

impl KeyValue {
    pub(crate) fn new(key: &str, value: &AnyValue) -> Self {
        KeyValue {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Resource {
    attributes: Vec<KeyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_url: Option<String>,
}

impl From<&otellogs_sdk::Resource> for Resource {
    fn from(value: &otellogs_sdk::Resource) -> Self {
        Resource {
            attributes: value
                .iter()
                .map(|(key, value)| KeyValue::new(key.as_str(), value))
                .collect(),
            schema_url: value.schema_url().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Scope {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<KeyValue>,
}

impl From<&otellogs::InstrumentationScope> for Scope {
    fn from(value: &otellogs::InstrumentationScope) -> Self {
        Scope {
            name: value.name().to_string(),
            version: value.version().map(str::to_string),
            attributes: value
                .attributes()
                .map(|kv| KeyValue::new(kv.key.as_str(), &kv.value))
                .collect(),
        }
    }
}

pub(crate) fn as_unix_nano<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let nanos = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    serializer.serialize_u64(nanos)
}

pub(crate) fn as_human_readable<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_time(*time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_value_kind_has_its_own_tag() {
        let cases = [
            (AnyValue::Null, json!("nullValue")),
            (AnyValue::Boolean(true), json!({"boolValue": true})),
            (AnyValue::Int(-7), json!({"intValue": -7})),
            (AnyValue::Double(0.5), json!({"doubleValue": 0.5})),
            (AnyValue::String("x".into()), json!({"stringValue": "x"})),
            (AnyValue::Bytes(vec![1, 2]), json!({"bytesValue": [1, 2]})),
            (
                AnyValue::ListAny(vec![AnyValue::Int(1)]),
                json!({"arrayValue": [{"intValue": 1}]}),
            ),
            (
                AnyValue::Map(vec![("k".into(), AnyValue::Boolean(false))]),
                json!({"kvListValue": [{"key": "k", "value": {"boolValue": false}}]}),
            ),
        ];

        for (value, expected) in cases {
            assert_eq!(serde_json::to_value(Value::from(&value)).unwrap(), expected);
        }
    }
}
