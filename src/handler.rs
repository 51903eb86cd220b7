use crate::formatter::{EventFormatter, FormatterConfig, SchemaVersion};
use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Conventional Logstash collector port for the TCP and UDP inputs.
pub const DEFAULT_PORT: u16 = 5959;

/// Transport destination for [`LogRecord`]s produced by the logging layer.
///
/// Implementations own one [`EventFormatter`] and a wire mechanism
/// (HTTP, TCP, UDP). The layer calls `emit` from a background task and
/// never awaits it on the application thread.
#[async_trait]
pub trait LogstashHandler: Send + Sync {
    /// Format and ship a single record, best-effort.
    ///
    /// **Returns**
    /// - `Ok(())` if the bytes were handed to the wire.
    /// - `Err(..)` on any transport failure (connection refused, DNS,
    ///   socket write). The layer reports the failure on the facility's
    ///   error channel and drops the record; it never reaches the
    ///   emitting application as a crash.
    async fn emit(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Construction parameters common to every transport handler.
#[derive(Clone, Debug)]
pub struct EventOptions {
    /// Message-type label, lands in the document's `type` field.
    pub message_type: String,
    /// Tags forwarded verbatim with every event.
    pub tags: Vec<String>,
    /// Report the fully-qualified host name instead of the short one.
    pub fqdn: bool,
    /// Event schema spoken by the collector.
    pub version: SchemaVersion,
}

impl Default for EventOptions {
    fn default() -> Self {
        EventOptions {
            message_type: "logstash".to_string(),
            tags: Vec::new(),
            fqdn: false,
            version: SchemaVersion::V0,
        }
    }
}

impl EventOptions {
    /// Build the formatter these options describe.
    pub fn formatter(&self) -> Box<dyn EventFormatter> {
        self.version.formatter(FormatterConfig {
            message_type: self.message_type.clone(),
            tags: self.tags.clone(),
            fqdn: self.fqdn,
        })
    }
}
