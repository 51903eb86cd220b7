use crate::handler::LogstashHandler;
use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// A handler that simply drops all records.
///
/// Useful for measuring the overhead of the layer itself without any
/// network I/O, and for unit tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopHandler;

#[async_trait]
impl LogstashHandler for NoopHandler {
    async fn emit(&self, _record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
