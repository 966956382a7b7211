use opentelemetry_proto::tonic::common::v1::{
    any_value, AnyValue as ProtoAnyValue, ArrayValue, InstrumentationScope as ProtoScope,
    KeyValue as ProtoKeyValue, KeyValueList,
};
use otellogs::logs::AnyValue;
use otellogs::{InstrumentationScope, Key};
use otellogs_sdk::Resource;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub(crate) fn to_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_nanos() as u64
}

/// Wrapper type for Vec<[`KeyValue`](ProtoKeyValue)>
#[derive(Debug, Default)]
pub(crate) struct Attributes(pub(crate) Vec<ProtoKeyValue>);

impl<'a> FromIterator<(&'a Key, &'a AnyValue)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (&'a Key, &'a AnyValue)>>(iter: T) -> Self {
        Attributes(
            iter.into_iter()
                .map(|(key, value)| ProtoKeyValue {
                    key: key.as_str().to_string(),
                    value: Some(value_to_proto(value)),
                })
                .collect(),
        )
    }
}

/// Maps a log value onto the wire's tagged value. [`AnyValue::Null`] becomes
/// a value with no variant set.
pub(crate) fn value_to_proto(value: &AnyValue) -> ProtoAnyValue {
    let value = match value {
        AnyValue::Null => None,
        AnyValue::Int(i) => Some(any_value::Value::IntValue(*i)),
        AnyValue::Double(f) => Some(any_value::Value::DoubleValue(*f)),
        AnyValue::String(s) => Some(any_value::Value::StringValue(s.to_string())),
        AnyValue::Boolean(b) => Some(any_value::Value::BoolValue(*b)),
        AnyValue::Bytes(bytes) => Some(any_value::Value::BytesValue(bytes.clone())),
        AnyValue::ListAny(values) => Some(any_value::Value::ArrayValue(ArrayValue {
            values: values.iter().map(value_to_proto).collect(),
        })),
        AnyValue::Map(entries) => Some(any_value::Value::KvlistValue(KeyValueList {
            values: entries.iter().map(|(k, v)| (k, v)).collect::<Attributes>().0,
        })),
    };
    ProtoAnyValue { value }
}

pub(crate) fn scope_to_proto(scope: &InstrumentationScope) -> ProtoScope {
    ProtoScope {
        name: scope.name().to_string(),
        version: scope.version().map(ToString::to_string).unwrap_or_default(),
        attributes: scope
            .attributes()
            .map(|kv| (&kv.key, &kv.value))
            .collect::<Attributes>()
            .0,
        ..Default::default()
    }
}

pub(crate) fn resource_attributes(resource: &Resource) -> Attributes {
    resource.iter().collect()
}
