/// Environment variable names used by this crate for convenient
/// configuration of handlers from services.
///
/// These are purely helpers; the core handler types remain decoupled
/// from environment access.

/// Collector DSN, e.g. `udp://logstash.internal:5959`.
pub const LOGSTASH_SINK_DSN_ENV: &str = "LOGSTASH_SINK_DSN";

/// Message-type label attached to every event.
pub const LOGSTASH_SINK_MESSAGE_TYPE_ENV: &str = "LOGSTASH_SINK_MESSAGE_TYPE";

/// Comma-separated tag list attached to every event.
pub const LOGSTASH_SINK_TAGS_ENV: &str = "LOGSTASH_SINK_TAGS";

/// Event schema version, "0" or "1".
pub const LOGSTASH_SINK_VERSION_ENV: &str = "LOGSTASH_SINK_VERSION";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
