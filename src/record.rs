use crate::value::LogValue;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;

/// One structured log event, as handed to a formatter.
///
/// The layer builds one of these per `tracing` event; formatters only
/// read it. Caller-supplied data lives in `fields` as an explicit,
/// ordered container rather than being rediscovered by reflection.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    /// Severity name, e.g. "ERROR".
    pub level: String,
    /// Logger name; the event target in `tracing` terms.
    pub logger: String,
    pub pathname: Option<String>,
    pub lineno: Option<u32>,
    pub thread_name: Option<String>,
    /// Process id of the emitting process.
    pub process: u32,
    pub process_name: Option<String>,
    pub exc_info: Option<ExceptionInfo>,
    /// Caller-supplied extra fields, in key order.
    pub fields: BTreeMap<String, LogValue>,
    /// Optional "<module>.<Class>" of the emitting call site, filled in
    /// by whoever builds the record. Absent means unknown, never an error.
    pub caller_class: Option<String>,
}

impl LogRecord {
    /// Create a record stamped with the current time, thread and process.
    pub fn new(level: impl Into<String>, message: impl Into<String>, logger: impl Into<String>) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            message: message.into(),
            level: level.into(),
            logger: logger.into(),
            pathname: None,
            lineno: None,
            thread_name: std::thread::current().name().map(str::to_string),
            process: std::process::id(),
            process_name: None,
            exc_info: None,
            fields: BTreeMap::new(),
            caller_class: None,
        }
    }

    pub fn with_source(mut self, pathname: impl Into<String>, lineno: u32) -> Self {
        self.pathname = Some(pathname.into());
        self.lineno = Some(lineno);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<LogValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_exc_info(mut self, exc_info: ExceptionInfo) -> Self {
        self.exc_info = Some(exc_info);
        self
    }

    pub fn with_caller_class(mut self, caller_class: impl Into<String>) -> Self {
        self.caller_class = Some(caller_class.into());
        self
    }
}

/// Captured failure context attached to a record.
///
/// The Rust counterpart of an exception triple: an error kind, its
/// message, and the chain of causes standing in for a traceback.
#[derive(Debug, Clone, Serialize)]
pub struct ExceptionInfo {
    pub exc_type: String,
    pub message: String,
    pub causes: Vec<String>,
}

impl ExceptionInfo {
    pub fn new(exc_type: impl Into<String>, message: impl Into<String>) -> Self {
        ExceptionInfo {
            exc_type: exc_type.into(),
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Capture an error and its `source()` chain.
    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        let mut info = ExceptionInfo::new("error", err.to_string());
        let mut source = err.source();
        while let Some(cause) = source {
            info.causes.push(cause.to_string());
            source = cause.source();
        }
        info
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "disk unplugged")
        }
    }

    impl Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "write failed")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn record_builder_sets_fields() {
        let record = LogRecord::new("INFO", "hello", "app::db")
            .with_source("src/db.rs", 42)
            .with_field("user_id", 7i64);

        assert_eq!(record.level, "INFO");
        assert_eq!(record.lineno, Some(42));
        assert_eq!(record.process, std::process::id());
        assert!(record.fields.contains_key("user_id"));
        assert!(record.exc_info.is_none());
    }

    #[test]
    fn exception_info_walks_source_chain() {
        let err = Outer(Inner);
        let info = ExceptionInfo::from_error(&err);
        assert_eq!(info.message, "write failed");
        assert_eq!(info.causes, vec!["disk unplugged".to_string()]);
    }
}
