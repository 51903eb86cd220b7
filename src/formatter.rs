use crate::record::{ExceptionInfo, LogRecord};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Record field names that never count as caller-supplied extra data.
///
/// Mirrors the standard attribute set of the host logging facility's
/// record; anything outside this list is assumed to be custom data and
/// is forwarded to the collector.
const RESERVED_FIELDS: &[&str] = &[
    "args",
    "asctime",
    "created",
    "exc_info",
    "exc_text",
    "filename",
    "funcName",
    "id",
    "levelname",
    "levelno",
    "lineno",
    "module",
    "msecs",
    "message",
    "msg",
    "name",
    "pathname",
    "process",
    "processName",
    "relativeCreated",
    "thread",
    "threadName",
    "extra",
];

/// Construction-time configuration shared by all schema versions.
#[derive(Clone, Debug)]
pub struct FormatterConfig {
    /// Free-form classification label, lands in the `type` field.
    pub message_type: String,
    /// Tags forwarded verbatim, in order. Each formatter owns its copy.
    pub tags: Vec<String>,
    /// Report the hostname as returned by the OS instead of the short
    /// name before the first dot.
    pub fqdn: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        FormatterConfig {
            message_type: "Logstash".to_string(),
            tags: Vec::new(),
            fqdn: false,
        }
    }
}

fn resolve_host(fqdn: bool) -> String {
    let name = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    if fqdn {
        return name;
    }
    let short = name.split('.').next().unwrap_or("");
    if short.is_empty() {
        name
    } else {
        short.to_string()
    }
}

/// Envelope logic shared by every schema version: timestamps, host name,
/// extra-field extraction, and exception/debug info.
///
/// Immutable after construction; a single instance may be used from any
/// number of threads concurrently.
#[derive(Clone, Debug)]
pub struct FormatterBase {
    pub message_type: String,
    pub tags: Vec<String>,
    pub host: String,
}

impl FormatterBase {
    pub fn new(config: FormatterConfig) -> Self {
        let host = resolve_host(config.fqdn);
        FormatterBase {
            message_type: config.message_type,
            tags: config.tags,
            host,
        }
    }

    /// Caller-supplied fields that survive the reserved-name filter,
    /// each reduced to a JSON-safe value, plus `class_name` when the
    /// record carries a caller class.
    pub fn get_extra_fields(&self, record: &LogRecord) -> Map<String, Value> {
        let mut fields = Map::new();
        for (key, value) in &record.fields {
            if RESERVED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            fields.insert(key.clone(), value.simplify());
        }

        if let Some(caller_class) = &record.caller_class {
            fields.insert("class_name".to_string(), Value::String(caller_class.clone()));
        }

        fields
    }

    /// Failure context for records that carry exception info. Callers
    /// must only merge this when `record.exc_info` is present.
    pub fn get_debug_fields(&self, record: &LogRecord) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(
            "stack_trace".to_string(),
            Value::String(Self::format_exception(record.exc_info.as_ref())),
        );
        fields.insert("lineno".to_string(), record.lineno.map_or(Value::Null, Value::from));
        fields.insert("process".to_string(), Value::from(record.process));
        fields.insert(
            "thread_name".to_string(),
            record.thread_name.clone().map_or(Value::Null, Value::String),
        );
        fields
    }

    pub fn format_source(message_type: &str, host: &str, path: &str) -> String {
        format!("{}://{}/{}", message_type, host, path)
    }

    /// `YYYY-MM-DDTHH:MM:SS.mmmZ` in UTC, milliseconds by truncating the
    /// microsecond component.
    pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
        format!(
            "{}.{:03}Z",
            timestamp.format("%Y-%m-%dT%H:%M:%S"),
            timestamp.timestamp_subsec_micros() / 1000
        )
    }

    /// One string of failure text: `"{type}: {message}"` followed by a
    /// `Caused by:` line per cause. Empty when there is no exception.
    pub fn format_exception(exc_info: Option<&ExceptionInfo>) -> String {
        let Some(info) = exc_info else {
            return String::new();
        };
        let mut text = format!("{}: {}", info.exc_type, info.message);
        for cause in &info.causes {
            text.push_str("\nCaused by: ");
            text.push_str(cause);
        }
        text
    }

    pub fn serialize(message: &Map<String, Value>) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(message)
    }

    fn tags_value(&self) -> Value {
        Value::Array(self.tags.iter().cloned().map(Value::String).collect())
    }
}

/// A schema-versioned document builder over [`FormatterBase`].
///
/// `format` is the sole entry point used by transport handlers. A
/// serialization failure here means a value slipped past sanitization,
/// which is a bug in this crate rather than a runtime condition.
pub trait EventFormatter: Send + Sync {
    fn get_message(&self, record: &LogRecord) -> Map<String, Value>;

    fn format(&self, record: &LogRecord) -> Result<Vec<u8>, serde_json::Error> {
        FormatterBase::serialize(&self.get_message(record))
    }
}

/// Legacy v0 event schema: `@`-prefixed envelope keys with level, logger,
/// extras and debug info nested under `@fields`.
pub struct LogstashFormatterV0 {
    base: FormatterBase,
}

impl LogstashFormatterV0 {
    pub fn new(config: FormatterConfig) -> Self {
        LogstashFormatterV0 { base: FormatterBase::new(config) }
    }
}

impl EventFormatter for LogstashFormatterV0 {
    fn get_message(&self, record: &LogRecord) -> Map<String, Value> {
        let base = &self.base;
        let path = record.pathname.clone().unwrap_or_default();

        let mut fields = Map::new();
        fields.insert("levelname".to_string(), Value::String(record.level.clone()));
        fields.insert("logger".to_string(), Value::String(record.logger.clone()));
        fields.extend(base.get_extra_fields(record));
        if record.exc_info.is_some() {
            fields.extend(base.get_debug_fields(record));
        }

        let mut message = Map::new();
        message.insert(
            "@timestamp".to_string(),
            Value::String(FormatterBase::format_timestamp(&record.timestamp)),
        );
        message.insert("@message".to_string(), Value::String(record.message.clone()));
        message.insert(
            "@source".to_string(),
            Value::String(FormatterBase::format_source(&base.message_type, &base.host, &path)),
        );
        message.insert("@source_host".to_string(), Value::String(base.host.clone()));
        message.insert("@source_path".to_string(), Value::String(path));
        message.insert("@tags".to_string(), base.tags_value());
        message.insert("@type".to_string(), Value::String(base.message_type.clone()));
        message.insert("@fields".to_string(), Value::Object(fields));
        message
    }
}

/// Flat v1 event schema: unprefixed keys (except `@timestamp`), extras
/// and debug info merged at the document top level.
pub struct LogstashFormatterV1 {
    base: FormatterBase,
}

impl LogstashFormatterV1 {
    pub fn new(config: FormatterConfig) -> Self {
        LogstashFormatterV1 { base: FormatterBase::new(config) }
    }
}

impl EventFormatter for LogstashFormatterV1 {
    fn get_message(&self, record: &LogRecord) -> Map<String, Value> {
        let base = &self.base;
        let path = record.pathname.clone().unwrap_or_default();

        let mut message = Map::new();
        message.insert(
            "@timestamp".to_string(),
            Value::String(FormatterBase::format_timestamp(&record.timestamp)),
        );
        message.insert("message".to_string(), Value::String(record.message.clone()));
        message.insert("host".to_string(), Value::String(base.host.clone()));
        message.insert("path".to_string(), Value::String(path));
        message.insert("tags".to_string(), base.tags_value());
        message.insert("type".to_string(), Value::String(base.message_type.clone()));
        message.insert("level".to_string(), Value::String(record.level.clone()));
        message.insert("logger_name".to_string(), Value::String(record.logger.clone()));

        message.extend(base.get_extra_fields(record));
        if record.exc_info.is_some() {
            message.extend(base.get_debug_fields(record));
        }

        message
    }
}

/// Error returned when a caller asks for an event schema this crate does
/// not implement.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unsupported logstash event schema version {0}")]
pub struct UnsupportedVersion(pub u8);

/// The closed set of supported event schemas.
///
/// Unknown version numbers are rejected at construction time for every
/// transport; there is no silent fallback to v0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVersion {
    #[default]
    V0,
    V1,
}

impl SchemaVersion {
    /// Build the formatter implementing this schema version.
    pub fn formatter(self, config: FormatterConfig) -> Box<dyn EventFormatter> {
        match self {
            SchemaVersion::V0 => Box::new(LogstashFormatterV0::new(config)),
            SchemaVersion::V1 => Box::new(LogstashFormatterV1::new(config)),
        }
    }
}

impl TryFrom<u8> for SchemaVersion {
    type Error = UnsupportedVersion;

    fn try_from(version: u8) -> Result<Self, UnsupportedVersion> {
        match version {
            0 => Ok(SchemaVersion::V0),
            1 => Ok(SchemaVersion::V1),
            other => Err(UnsupportedVersion(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ExceptionInfo;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn sample_record() -> LogRecord {
        let mut record = LogRecord::new("ERROR", "boom in handler", "app::orders")
            .with_source("src/orders.rs", 77)
            .with_field("user_id", 1234i64)
            .with_field("request", "GET /orders");
        record.timestamp = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        record.thread_name = Some("worker-1".to_string());
        record
    }

    fn config_with_tags() -> FormatterConfig {
        FormatterConfig {
            message_type: "logstash".to_string(),
            tags: vec!["prod".to_string(), "orders".to_string()],
            fqdn: false,
        }
    }

    #[test]
    fn timestamp_truncates_microseconds() {
        // Epoch 1700000000.1234: the 123400us component must truncate to
        // 123ms, never round to 124.
        let ts = DateTime::<Utc>::from_timestamp(1_700_000_000, 123_400_000).unwrap();
        let formatted = FormatterBase::format_timestamp(&ts);
        assert_eq!(formatted, "2023-11-14T22:13:20.123Z");

        let ts = DateTime::<Utc>::from_timestamp(1_700_000_000, 999_999_000).unwrap();
        assert!(FormatterBase::format_timestamp(&ts).ends_with(".999Z"));
    }

    #[test]
    fn format_is_valid_json_and_round_trips() {
        let formatter = LogstashFormatterV1::new(config_with_tags());
        let record = sample_record();
        let bytes = formatter.format(&record).unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(doc["message"], "boom in handler");
        assert_eq!(doc["tags"], serde_json::json!(["prod", "orders"]));
        assert_eq!(doc["user_id"], 1234);
    }

    #[test]
    fn v0_and_v1_diverge_only_in_shape() {
        let record = sample_record();
        let v0 = LogstashFormatterV0::new(config_with_tags()).get_message(&record);
        let v1 = LogstashFormatterV1::new(config_with_tags()).get_message(&record);

        assert_eq!(v0["@timestamp"], v1["@timestamp"]);
        assert_eq!(v0["@message"], v1["message"]);
        assert_eq!(v0["@source_host"], v1["host"]);
        assert_eq!(v0["@source_path"], v1["path"]);
        assert_eq!(v0["@tags"], v1["tags"]);
        assert_eq!(v0["@type"], v1["type"]);
        assert_eq!(v0["@fields"]["levelname"], v1["level"]);
        assert_eq!(v0["@fields"]["logger"], v1["logger_name"]);
        assert_eq!(v0["@fields"]["user_id"], v1["user_id"]);

        let host = v1["host"].as_str().unwrap();
        assert_eq!(
            v0["@source"],
            Value::String(format!("logstash://{}/src/orders.rs", host))
        );
        // V1 keeps extras at the top level, V0 nests them.
        assert!(v1.get("@fields").is_none());
        assert!(v0.get("user_id").is_none());
    }

    #[test]
    fn reserved_extra_names_are_dropped() {
        let record = sample_record()
            .with_field("lineno", 9999i64)
            .with_field("thread", "sneaky")
            .with_field("user_id", 1234i64);
        let base = FormatterBase::new(config_with_tags());
        let extras = base.get_extra_fields(&record);

        assert!(extras.get("lineno").is_none());
        assert!(extras.get("thread").is_none());
        assert_eq!(extras["user_id"], 1234);
    }

    #[test]
    fn caller_class_is_optional_enrichment() {
        let base = FormatterBase::new(FormatterConfig::default());
        let plain = sample_record();
        assert!(base.get_extra_fields(&plain).get("class_name").is_none());

        let enriched = sample_record().with_caller_class("app::orders.OrderWorker");
        assert_eq!(
            base.get_extra_fields(&enriched)["class_name"],
            "app::orders.OrderWorker"
        );
    }

    #[test]
    fn debug_block_present_only_with_exception() {
        let formatter = LogstashFormatterV1::new(FormatterConfig::default());

        let plain = sample_record();
        let doc = formatter.get_message(&plain);
        assert!(doc.get("stack_trace").is_none());

        let failing = sample_record().with_exc_info(
            ExceptionInfo::new("io::Error", "connection reset").with_cause("peer closed"),
        );
        let doc = formatter.get_message(&failing);
        let trace = doc["stack_trace"].as_str().unwrap();
        assert!(!trace.is_empty());
        assert!(trace.contains("connection reset"));
        assert!(trace.contains("Caused by: peer closed"));
        assert_eq!(doc["lineno"], 77);
        assert_eq!(doc["thread_name"], "worker-1");
    }

    #[test]
    fn exception_formatting_is_empty_without_info() {
        assert_eq!(FormatterBase::format_exception(None), "");
    }

    #[test]
    fn unknown_versions_are_rejected() {
        assert_eq!(SchemaVersion::try_from(0), Ok(SchemaVersion::V0));
        assert_eq!(SchemaVersion::try_from(1), Ok(SchemaVersion::V1));
        assert_eq!(SchemaVersion::try_from(2), Err(UnsupportedVersion(2)));
    }

    #[test]
    fn shared_formatter_is_safe_across_threads() {
        let formatter: Arc<dyn EventFormatter> =
            Arc::from(SchemaVersion::V1.formatter(config_with_tags()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let formatter = Arc::clone(&formatter);
                std::thread::spawn(move || {
                    let record = LogRecord::new("INFO", format!("msg-{}", i), "app")
                        .with_field("worker", i as i64);
                    let doc: Value =
                        serde_json::from_slice(&formatter.format(&record).unwrap()).unwrap();
                    assert_eq!(doc["message"], format!("msg-{}", i));
                    assert_eq!(doc["worker"], i as i64);
                    assert_eq!(doc["tags"], serde_json::json!(["prod", "orders"]));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
