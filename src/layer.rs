use crate::handler::LogstashHandler;
use crate::record::{ExceptionInfo, LogRecord};
use crate::value::LogValue;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// forwards them to a [`LogstashHandler`] via a bounded channel and a
/// background task.
///
/// Delivery is best-effort: records are dropped when the channel is
/// full, and transport failures are reported on stderr instead of
/// propagating into the emitting application. Level filtering belongs
/// to the surrounding subscriber, not to this layer.
pub struct LogstashLayer {
    sender: mpsc::Sender<LogRecord>,
    /// Total events seen by the layer.
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into the channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full.
    pub dropped_events: Arc<AtomicU64>,
}

impl LogstashLayer {
    /// Create a new layer and spawn a background task that pulls
    /// [`LogRecord`]s from a bounded channel and emits them through the
    /// provided handler.
    ///
    /// A minimal threshold is enforced for `buffer` to avoid degenerate
    /// configurations.
    pub fn new(handler: Arc<dyn LogstashHandler>, buffer: usize) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let (tx, mut rx) = mpsc::channel::<LogRecord>(buffer);

        let total_events = Arc::new(AtomicU64::new(0));
        let enqueued_events = Arc::new(AtomicU64::new(0));
        let dropped_events = Arc::new(AtomicU64::new(0));

        let enqueued_events_bg = Arc::clone(&enqueued_events);

        let handle = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                enqueued_events_bg.fetch_add(1, Ordering::Relaxed);
                if let Err(e) = handler.emit(&record).await {
                    eprintln!("error emitting log record: {}", e);
                }
            }
        });

        (
            Self {
                sender: tx,
                total_events,
                enqueued_events,
                dropped_events,
            },
            handle,
        )
    }

    /// Build a [`LogRecord`] from a `tracing` event, in the same call
    /// chain that produced it.
    fn make_record(event: &Event) -> LogRecord {
        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut exc_info: Option<ExceptionInfo> = None;

        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
            exc_info: &mut exc_info,
        };
        event.record(&mut visitor);

        let meta = event.metadata();
        LogRecord {
            timestamp: Utc::now(),
            message: message.unwrap_or_default(),
            level: meta.level().to_string(),
            logger: meta.target().to_string(),
            pathname: meta.file().map(str::to_string),
            lineno: meta.line(),
            thread_name: std::thread::current().name().map(str::to_string),
            process: std::process::id(),
            process_name: None,
            exc_info,
            fields,
            caller_class: None,
        }
    }
}

impl<S> Layer<S> for LogstashLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let record = Self::make_record(event);
        if self.sender.try_send(record).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            eprintln!("log channel full, dropping log record");
        }
    }
}

use tracing::field::{Field, Visit};

/// Captures event fields into the record's value containers. The
/// `message` field becomes the record's message; the first error-typed
/// field becomes its exception info.
struct FieldVisitor<'a> {
    fields: &'a mut BTreeMap<String, LogValue>,
    message: &'a mut Option<String>,
    exc_info: &'a mut Option<ExceptionInfo>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), LogValue::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), LogValue::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), LogValue::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), LogValue::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), LogValue::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if self.exc_info.is_none() {
            *self.exc_info = Some(ExceptionInfo::from_error(value));
        } else {
            self.fields
                .insert(field.name().to_string(), LogValue::from(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), LogValue::opaque(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io;
    use tracing::subscriber::with_default;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    struct CapturingHandler {
        seen: tokio::sync::Mutex<Vec<LogRecord>>,
        notify: Arc<tokio::sync::Notify>,
    }

    impl CapturingHandler {
        fn new() -> (Arc<Self>, Arc<tokio::sync::Notify>) {
            let notify = Arc::new(tokio::sync::Notify::new());
            let handler = Arc::new(CapturingHandler {
                seen: tokio::sync::Mutex::new(Vec::new()),
                notify: Arc::clone(&notify),
            });
            (handler, notify)
        }
    }

    #[async_trait::async_trait]
    impl LogstashHandler for CapturingHandler {
        async fn emit(
            &self,
            record: &LogRecord,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.seen.lock().await.push(record.clone());
            self.notify.notify_one();
            Ok(())
        }
    }

    #[tokio::test]
    async fn events_become_records_with_fields() {
        let (handler, notify) = CapturingHandler::new();
        let (layer, _task) = LogstashLayer::new(handler.clone(), 64);
        let subscriber = Registry::default().with(layer);

        with_default(subscriber, || {
            tracing::error!(user_id = 42i64, request = "GET /", "request failed");
        });

        notify.notified().await;
        let seen = handler.seen.lock().await;
        let record = &seen[0];
        assert_eq!(record.message, "request failed");
        assert_eq!(record.level, "ERROR");
        assert_eq!(record.fields["user_id"], LogValue::Int(42));
        assert_eq!(record.fields["request"].simplify(), json!("GET /"));
        assert!(record.lineno.is_some());
    }

    #[tokio::test]
    async fn error_fields_become_exception_info() {
        let (handler, notify) = CapturingHandler::new();
        let (layer, _task) = LogstashLayer::new(handler.clone(), 64);
        let subscriber = Registry::default().with(layer);

        with_default(subscriber, || {
            let err = io::Error::new(io::ErrorKind::ConnectionReset, "peer went away");
            tracing::error!(error = &err as &(dyn std::error::Error + 'static), "write failed");
        });

        notify.notified().await;
        let seen = handler.seen.lock().await;
        let info = seen[0].exc_info.as_ref().expect("exception info captured");
        assert_eq!(info.message, "peer went away");
    }
}
