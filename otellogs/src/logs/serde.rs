use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{
    self, Serialize, SerializeMap, SerializeSeq, SerializeStruct, SerializeStructVariant,
    SerializeTuple, SerializeTupleStruct, SerializeTupleVariant, Serializer, StdError,
};

use crate::{logs::AnyValue, Key};

/// Encode an arbitrary `serde::Serialize` into an [`AnyValue`] tree.
///
/// Translations from `serde`'s data model:
///
/// - Integers are widened to `i64`. Values outside the `i64` range saturate
///   at `i64::MAX` or `i64::MIN`.
/// - Byte slices, and non-empty sequences whose elements are all `u8`, become
///   [`AnyValue::Bytes`].
/// - `None` and unit at the top level, or as a map/struct field, are absent
///   and the field is skipped. Inside a sequence they become
///   [`AnyValue::Null`] so positions are preserved.
/// - Maps and structs become [`AnyValue::Map`] in field order.
/// - Unit variants become strings. Newtype, tuple and struct variants become
///   a single-entry map keyed by the variant name.
/// - Non-string map keys are rendered as text.
///
/// There is no cycle detection. A `Serialize` impl that refers back to
/// itself recurses until the stack is exhausted.
///
/// ```
/// use otellogs::logs::{serialize, AnyValue};
///
/// #[derive(serde::Serialize)]
/// struct Login<'a> { user: &'a str, attempts: u32 }
///
/// let value = serialize(Login { user: "ana", attempts: 3 }).unwrap();
/// assert_eq!(value.get("attempts"), Some(&AnyValue::Int(3)));
/// ```
pub fn serialize(value: impl Serialize) -> Option<AnyValue> {
    value.serialize(ValueSerializer).ok()?.into_value()
}

/// Formats a timestamp as RFC 3339 with nanosecond precision in UTC.
pub fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// `#[serde(with = "...")]` helper writing a [`SystemTime`] as an RFC 3339
/// string, so that [`serialize`] renders it as a string value.
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// #[derive(serde::Serialize)]
/// struct Event {
///     #[serde(serialize_with = "otellogs::logs::rfc3339_nanos::serialize")]
///     at: SystemTime,
/// }
///
/// let at = SystemTime::UNIX_EPOCH + Duration::from_nanos(1_500);
/// let value = otellogs::logs::serialize(Event { at }).unwrap();
/// assert_eq!(
///     value.get("at").and_then(|v| v.as_str()),
///     Some("1970-01-01T00:00:00.000001500Z")
/// );
/// ```
pub mod rfc3339_nanos {
    use serde::Serializer;
    use std::time::SystemTime;

    /// Serializes `time` as an RFC 3339 string.
    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time(*time))
    }
}

/// Intermediate result of encoding one serde value.
///
/// `Byte` is kept apart from `Int` until the enclosing sequence decides
/// whether it is a byte string.
enum Node {
    Absent,
    Byte(u8),
    Value(AnyValue),
}

impl Node {
    fn into_value(self) -> Option<AnyValue> {
        match self {
            Node::Absent => None,
            Node::Byte(b) => Some(AnyValue::Int(b.into())),
            Node::Value(v) => Some(v),
        }
    }

    fn into_element(self) -> AnyValue {
        self.into_value().unwrap_or(AnyValue::Null)
    }
}

fn within_variant(variant: Option<&'static str>, value: AnyValue) -> Node {
    match variant {
        Some(name) => Node::Value(AnyValue::Map(vec![(Key::from_static_str(name), value)])),
        None => Node::Value(value),
    }
}

fn key_text(node: Node) -> Key {
    match node.into_value() {
        Some(AnyValue::String(s)) => Key::from(s),
        Some(AnyValue::Int(i)) => Key::from(i.to_string()),
        Some(AnyValue::Double(d)) => Key::from(d.to_string()),
        Some(AnyValue::Boolean(b)) => Key::from(b.to_string()),
        other => Key::from(format!("{other:?}")),
    }
}

#[derive(Debug)]
struct EncodeError(String);

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for EncodeError {}

impl ser::Error for EncodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        EncodeError(msg.to_string())
    }
}

struct ValueSerializer;

/// Collects sequences, tuples and tuple variants.
struct ListEncoder {
    variant: Option<&'static str>,
    items: Vec<Node>,
}

impl ListEncoder {
    fn new(variant: Option<&'static str>, len: Option<usize>) -> Self {
        ListEncoder {
            variant,
            items: Vec::with_capacity(len.unwrap_or_default()),
        }
    }

    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn finish(self) -> Node {
        let all_bytes =
            !self.items.is_empty() && self.items.iter().all(|n| matches!(n, Node::Byte(_)));
        let list = if all_bytes {
            AnyValue::Bytes(
                self.items
                    .into_iter()
                    .filter_map(|n| match n {
                        Node::Byte(b) => Some(b),
                        _ => None,
                    })
                    .collect(),
            )
        } else {
            AnyValue::ListAny(self.items.into_iter().map(Node::into_element).collect())
        };
        within_variant(self.variant, list)
    }
}

/// Collects maps, structs and struct variants.
struct MapEncoder {
    variant: Option<&'static str>,
    pending_key: Option<Key>,
    entries: Vec<(Key, AnyValue)>,
}

impl MapEncoder {
    fn new(variant: Option<&'static str>, len: Option<usize>) -> Self {
        MapEncoder {
            variant,
            pending_key: None,
            entries: Vec::with_capacity(len.unwrap_or_default()),
        }
    }

    fn push<T: Serialize + ?Sized>(&mut self, key: Key, value: &T) -> Result<(), EncodeError> {
        if let Some(value) = value.serialize(ValueSerializer)?.into_value() {
            self.entries.push((key, value));
        }
        Ok(())
    }

    fn finish(self) -> Node {
        within_variant(self.variant, AnyValue::Map(self.entries))
    }
}

impl Serializer for ValueSerializer {
    type Ok = Node;
    type Error = EncodeError;

    type SerializeSeq = ListEncoder;
    type SerializeTuple = ListEncoder;
    type SerializeTupleStruct = ListEncoder;
    type SerializeTupleVariant = ListEncoder;
    type SerializeMap = MapEncoder;
    type SerializeStruct = MapEncoder;
    type SerializeStructVariant = MapEncoder;

    fn serialize_bool(self, v: bool) -> Result<Node, EncodeError> {
        Ok(Node::Value(AnyValue::Boolean(v)))
    }

    fn serialize_i8(self, v: i8) -> Result<Node, EncodeError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<Node, EncodeError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<Node, EncodeError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<Node, EncodeError> {
        Ok(Node::Value(AnyValue::Int(v)))
    }

    fn serialize_i128(self, v: i128) -> Result<Node, EncodeError> {
        let clamped = v.clamp(i64::MIN.into(), i64::MAX.into());
        self.serialize_i64(i64::try_from(clamped).unwrap_or(i64::MAX))
    }

    fn serialize_u8(self, v: u8) -> Result<Node, EncodeError> {
        Ok(Node::Byte(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Node, EncodeError> {
        self.serialize_i64(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<Node, EncodeError> {
        self.serialize_i64(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<Node, EncodeError> {
        self.serialize_i64(i64::try_from(v).unwrap_or(i64::MAX))
    }

    fn serialize_u128(self, v: u128) -> Result<Node, EncodeError> {
        self.serialize_i64(i64::try_from(v).unwrap_or(i64::MAX))
    }

    fn serialize_f32(self, v: f32) -> Result<Node, EncodeError> {
        self.serialize_f64(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<Node, EncodeError> {
        Ok(Node::Value(AnyValue::Double(v)))
    }

    fn serialize_char(self, v: char) -> Result<Node, EncodeError> {
        Ok(Node::Value(AnyValue::String(v.to_string().into())))
    }

    fn serialize_str(self, v: &str) -> Result<Node, EncodeError> {
        Ok(Node::Value(AnyValue::String(v.to_owned().into())))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Node, EncodeError> {
        Ok(Node::Value(AnyValue::Bytes(v.to_vec())))
    }

    fn serialize_none(self) -> Result<Node, EncodeError> {
        Ok(Node::Absent)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Node, EncodeError> {
        // An optional byte is a number; only bare `u8` sequences are bytes.
        match value.serialize(self)? {
            Node::Byte(b) => Ok(Node::Value(AnyValue::Int(b.into()))),
            node => Ok(node),
        }
    }

    fn serialize_unit(self) -> Result<Node, EncodeError> {
        Ok(Node::Absent)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Node, EncodeError> {
        self.serialize_str(name)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Node, EncodeError> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Node, EncodeError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Node, EncodeError> {
        let mut map = MapEncoder::new(None, Some(1));
        map.push(Key::from_static_str(variant), value)?;
        Ok(map.finish())
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<ListEncoder, EncodeError> {
        Ok(ListEncoder::new(None, len))
    }

    fn serialize_tuple(self, len: usize) -> Result<ListEncoder, EncodeError> {
        Ok(ListEncoder::new(None, Some(len)))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<ListEncoder, EncodeError> {
        Ok(ListEncoder::new(None, Some(len)))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<ListEncoder, EncodeError> {
        Ok(ListEncoder::new(Some(variant), Some(len)))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapEncoder, EncodeError> {
        Ok(MapEncoder::new(None, len))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapEncoder, EncodeError> {
        Ok(MapEncoder::new(None, Some(len)))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<MapEncoder, EncodeError> {
        Ok(MapEncoder::new(Some(variant), Some(len)))
    }
}

impl SerializeSeq for ListEncoder {
    type Ok = Node;
    type Error = EncodeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.push(value)
    }

    fn end(self) -> Result<Node, EncodeError> {
        Ok(self.finish())
    }
}

impl SerializeTuple for ListEncoder {
    type Ok = Node;
    type Error = EncodeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.push(value)
    }

    fn end(self) -> Result<Node, EncodeError> {
        Ok(self.finish())
    }
}

impl SerializeTupleStruct for ListEncoder {
    type Ok = Node;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.push(value)
    }

    fn end(self) -> Result<Node, EncodeError> {
        Ok(self.finish())
    }
}

impl SerializeTupleVariant for ListEncoder {
    type Ok = Node;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.push(value)
    }

    fn end(self) -> Result<Node, EncodeError> {
        Ok(self.finish())
    }
}

impl SerializeMap for MapEncoder {
    type Ok = Node;
    type Error = EncodeError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), EncodeError> {
        self.pending_key = Some(key_text(key.serialize(ValueSerializer)?));
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| <EncodeError as ser::Error>::custom("map value without a key"))?;
        self.push(key, value)
    }

    fn end(self) -> Result<Node, EncodeError> {
        Ok(self.finish())
    }
}

impl SerializeStruct for MapEncoder {
    type Ok = Node;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodeError> {
        self.push(Key::from_static_str(key), value)
    }

    fn end(self) -> Result<Node, EncodeError> {
        Ok(self.finish())
    }
}

impl SerializeStructVariant for MapEncoder {
    type Ok = Node;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodeError> {
        self.push(Key::from_static_str(key), value)
    }

    fn end(self) -> Result<Node, EncodeError> {
        Ok(self.finish())
    }
}
