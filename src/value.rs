use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// A value attached to a [`LogRecord`](crate::record::LogRecord) as an
/// extra field.
///
/// This is a closed union of everything the Logstash event schema can
/// carry. Anything that does not fit one of the structured variants is
/// captured as [`LogValue::Opaque`] with a debug rendering taken at the
/// call site, so that sanitization can never fail later in the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Ordered sequence; element order is preserved through simplification.
    Seq(Vec<LogValue>),
    /// Key/value pairs in insertion order. Keys are arbitrary values and
    /// are stringified during simplification when they are not strings.
    Map(Vec<(LogValue, LogValue)>),
    /// Debug rendering of a value outside the closed set, precomputed at
    /// capture time.
    Opaque(String),
}

impl LogValue {
    /// Capture an arbitrary value by its debug representation.
    pub fn opaque(value: impl Debug) -> Self {
        LogValue::Opaque(format!("{:?}", value))
    }

    /// Reduce this value to a JSON-safe [`serde_json::Value`].
    ///
    /// Total: every variant maps to a JSON value whose leaves are one of
    /// {string, bool, float, int, null}. Sequences keep their order, maps
    /// keep insertion order with non-string keys stringified.
    pub fn simplify(&self) -> serde_json::Value {
        match self {
            LogValue::Null => serde_json::Value::Null,
            LogValue::Bool(b) => serde_json::Value::Bool(*b),
            LogValue::Int(i) => serde_json::Value::from(*i),
            LogValue::Float(f) => {
                // JSON has no NaN/Inf; fall back to their textual form.
                serde_json::Number::from_f64(*f)
                    .map(serde_json::Value::Number)
                    .unwrap_or_else(|| serde_json::Value::String(f.to_string()))
            }
            LogValue::Str(s) => serde_json::Value::String(s.clone()),
            LogValue::Seq(items) => {
                serde_json::Value::Array(items.iter().map(LogValue::simplify).collect())
            }
            LogValue::Map(entries) => {
                let mut map = serde_json::Map::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(simplify_key(key), value.simplify());
                }
                serde_json::Value::Object(map)
            }
            LogValue::Opaque(repr) => serde_json::Value::String(repr.clone()),
        }
    }
}

/// JSON object keys must be strings; string keys pass through unchanged
/// and everything else is rendered through its simplified JSON form.
fn simplify_key(key: &LogValue) -> String {
    match key.simplify() {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

impl Serialize for LogValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.simplify().serialize(serializer)
    }
}

impl From<bool> for LogValue {
    fn from(value: bool) -> Self {
        LogValue::Bool(value)
    }
}

impl From<i32> for LogValue {
    fn from(value: i32) -> Self {
        LogValue::Int(value.into())
    }
}

impl From<i64> for LogValue {
    fn from(value: i64) -> Self {
        LogValue::Int(value)
    }
}

impl From<u32> for LogValue {
    fn from(value: u32) -> Self {
        LogValue::Int(value.into())
    }
}

impl From<u64> for LogValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(LogValue::Int)
            .unwrap_or(LogValue::Float(value as f64))
    }
}

impl From<f64> for LogValue {
    fn from(value: f64) -> Self {
        LogValue::Float(value)
    }
}

impl From<&str> for LogValue {
    fn from(value: &str) -> Self {
        LogValue::Str(value.to_string())
    }
}

impl From<String> for LogValue {
    fn from(value: String) -> Self {
        LogValue::Str(value)
    }
}

impl<T: Into<LogValue>> From<Option<T>> for LogValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(LogValue::Null)
    }
}

impl<T: Into<LogValue>> From<Vec<T>> for LogValue {
    fn from(value: Vec<T>) -> Self {
        LogValue::Seq(value.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<LogValue>, V: Into<LogValue>> From<BTreeMap<K, V>> for LogValue {
    fn from(value: BTreeMap<K, V>) -> Self {
        LogValue::Map(value.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
