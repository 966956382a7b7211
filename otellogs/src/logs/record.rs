use crate::{Key, SpanId, TraceFlags, TraceId};
use std::{borrow::Cow, time::SystemTime};

/// The mutable side of a log record, as seen by appenders.
///
/// The SDK provides the concrete type; appenders obtain one from
/// [`Logger::create_log_record`](super::Logger::create_log_record), fill it in
/// and hand it back through [`Logger::emit`](super::Logger::emit).
pub trait LogRecord {
    /// Sets the time when the event occurred.
    fn set_timestamp(&mut self, timestamp: SystemTime);

    /// Sets the time when the event was observed by the logging pipeline.
    fn set_observed_timestamp(&mut self, timestamp: SystemTime);

    /// Correlates the record with a trace.
    fn set_trace_context(
        &mut self,
        trace_id: TraceId,
        span_id: SpanId,
        trace_flags: Option<TraceFlags>,
    );

    /// Sets severity as text.
    fn set_severity_text(&mut self, text: Cow<'static, str>);

    /// Sets severity as a numeric value.
    fn set_severity_number(&mut self, number: Severity);

    /// Sets the message body of the log.
    fn set_body(&mut self, body: AnyValue);

    /// Appends attributes, keeping their order.
    fn add_attributes<I, K, V>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<AnyValue>;

    /// Appends a single attribute. Keys are not de-duplicated.
    fn add_attribute<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Key>,
        V: Into<AnyValue>;
}

/// Value types for representing arbitrary values in a log record.
///
/// Maps keep insertion order and lists may contain [`AnyValue::Null`]
/// entries, so a value tree round-trips the shape of the data it was built
/// from.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyValue {
    /// An explicit absent value inside a list
    Null,
    /// An integer value
    Int(i64),
    /// A double value
    Double(f64),
    /// A string value
    String(Cow<'static, str>),
    /// A boolean value
    Boolean(bool),
    /// A byte array
    Bytes(Vec<u8>),
    /// An array of `Any` values
    ListAny(Vec<AnyValue>),
    /// An ordered list of key/value entries, arbitrarily nested.
    Map(Vec<(Key, AnyValue)>),
}

impl AnyValue {
    /// Returns the string content if this is a [`AnyValue::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnyValue::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Looks up the first entry with `key` in a [`AnyValue::Map`].
    pub fn get(&self, key: &str) -> Option<&AnyValue> {
        match self {
            AnyValue::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

macro_rules! impl_trivial_from {
    ($t:ty, $variant:path) => {
        impl From<$t> for AnyValue {
            fn from(val: $t) -> AnyValue {
                $variant(val.into())
            }
        }
    };
}

impl_trivial_from!(i8, AnyValue::Int);
impl_trivial_from!(i16, AnyValue::Int);
impl_trivial_from!(i32, AnyValue::Int);
impl_trivial_from!(i64, AnyValue::Int);

impl_trivial_from!(u8, AnyValue::Int);
impl_trivial_from!(u16, AnyValue::Int);
impl_trivial_from!(u32, AnyValue::Int);

impl_trivial_from!(f64, AnyValue::Double);
impl_trivial_from!(f32, AnyValue::Double);

impl_trivial_from!(String, AnyValue::String);
impl_trivial_from!(Cow<'static, str>, AnyValue::String);
impl_trivial_from!(&'static str, AnyValue::String);

impl_trivial_from!(bool, AnyValue::Boolean);

impl From<u64> for AnyValue {
    /// Values above `i64::MAX` saturate.
    fn from(val: u64) -> AnyValue {
        AnyValue::Int(i64::try_from(val).unwrap_or(i64::MAX))
    }
}

impl From<Vec<u8>> for AnyValue {
    fn from(val: Vec<u8>) -> AnyValue {
        AnyValue::Bytes(val)
    }
}

impl<T: Into<AnyValue>> FromIterator<T> for AnyValue {
    /// Creates an [`AnyValue::ListAny`] value from a sequence of `Into<AnyValue>` values.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        AnyValue::ListAny(iter.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<Key>, V: Into<AnyValue>> FromIterator<(K, V)> for AnyValue {
    /// Creates an [`AnyValue::Map`] keeping the iteration order.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        AnyValue::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A normalized severity value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub enum Severity {
    /// TRACE
    Trace = 1,
    /// TRACE2
    Trace2 = 2,
    /// TRACE3
    Trace3 = 3,
    /// TRACE4
    Trace4 = 4,
    /// DEBUG
    Debug = 5,
    /// DEBUG2
    Debug2 = 6,
    /// DEBUG3
    Debug3 = 7,
    /// DEBUG4
    Debug4 = 8,
    /// INFO
    Info = 9,
    /// INFO2
    Info2 = 10,
    /// INFO3
    Info3 = 11,
    /// INFO4
    Info4 = 12,
    /// WARN
    Warn = 13,
    /// WARN2
    Warn2 = 14,
    /// WARN3
    Warn3 = 15,
    /// WARN4
    Warn4 = 16,
    /// ERROR
    Error = 17,
    /// ERROR2
    Error2 = 18,
    /// ERROR3
    Error3 = 19,
    /// ERROR4
    Error4 = 20,
    /// FATAL
    Fatal = 21,
    /// FATAL2
    Fatal2 = 22,
    /// FATAL3
    Fatal3 = 23,
    /// FATAL4
    Fatal4 = 24,
}

const ALL_SEVERITIES: [Severity; 24] = [
    Severity::Trace,
    Severity::Trace2,
    Severity::Trace3,
    Severity::Trace4,
    Severity::Debug,
    Severity::Debug2,
    Severity::Debug3,
    Severity::Debug4,
    Severity::Info,
    Severity::Info2,
    Severity::Info3,
    Severity::Info4,
    Severity::Warn,
    Severity::Warn2,
    Severity::Warn3,
    Severity::Warn4,
    Severity::Error,
    Severity::Error2,
    Severity::Error3,
    Severity::Error4,
    Severity::Fatal,
    Severity::Fatal2,
    Severity::Fatal3,
    Severity::Fatal4,
];

impl Severity {
    /// Short name of the severity as defined by the logs data model.
    pub const fn name(&self) -> &'static str {
        match &self {
            Severity::Trace => "TRACE",
            Severity::Trace2 => "TRACE2",
            Severity::Trace3 => "TRACE3",
            Severity::Trace4 => "TRACE4",

            Severity::Debug => "DEBUG",
            Severity::Debug2 => "DEBUG2",
            Severity::Debug3 => "DEBUG3",
            Severity::Debug4 => "DEBUG4",

            Severity::Info => "INFO",
            Severity::Info2 => "INFO2",
            Severity::Info3 => "INFO3",
            Severity::Info4 => "INFO4",

            Severity::Warn => "WARN",
            Severity::Warn2 => "WARN2",
            Severity::Warn3 => "WARN3",
            Severity::Warn4 => "WARN4",

            Severity::Error => "ERROR",
            Severity::Error2 => "ERROR2",
            Severity::Error3 => "ERROR3",
            Severity::Error4 => "ERROR4",

            Severity::Fatal => "FATAL",
            Severity::Fatal2 => "FATAL2",
            Severity::Fatal3 => "FATAL3",
            Severity::Fatal4 => "FATAL4",
        }
    }

    /// The 1 to 24 ordinal carried on the wire.
    pub const fn number(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for Severity {
    type Error = i32;

    /// Fails with the input when it is outside 1 to 24.
    fn try_from(value: i32) -> Result<Self, i32> {
        usize::try_from(value)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| ALL_SEVERITIES.get(idx).copied())
            .ok_or(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, Some(Severity::Trace))]
    #[case(9, Some(Severity::Info))]
    #[case(24, Some(Severity::Fatal4))]
    #[case(0, None)]
    #[case(25, None)]
    #[case(-3, None)]
    fn severity_from_number(#[case] raw: i32, #[case] expected: Option<Severity>) {
        assert_eq!(Severity::try_from(raw).ok(), expected);
    }

    #[test]
    fn severity_numbers_follow_declaration_order() {
        for (idx, severity) in ALL_SEVERITIES.iter().enumerate() {
            assert_eq!(severity.number() as usize, idx + 1);
        }
    }

    #[test]
    fn map_keeps_insertion_order() {
        let value: AnyValue = [("z", 1), ("a", 2), ("z", 3)].into_iter().collect();
        let AnyValue::Map(entries) = &value else {
            panic!("expected map");
        };
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["z", "a", "z"]);
        assert_eq!(value.get("z"), Some(&AnyValue::Int(1)));
    }

    #[test]
    fn u64_saturates() {
        assert_eq!(AnyValue::from(u64::MAX), AnyValue::Int(i64::MAX));
        assert_eq!(AnyValue::from(7u64), AnyValue::Int(7));
    }
}
