use crate::formatter::EventFormatter;
use crate::handler::{EventOptions, LogstashHandler, DEFAULT_PORT};
use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// TCP implementation of [`LogstashHandler`].
///
/// Connects lazily on the first emit and reuses the stream afterwards.
/// Each record becomes one serialized document followed by a newline.
/// A failed write drops the connection so the next emit reconnects.
pub struct TcpHandler {
    addr: String,
    formatter: Box<dyn EventFormatter>,
    conn: Mutex<Option<TcpStream>>,
}

impl TcpHandler {
    pub fn new(host: impl Into<String>, port: u16, options: EventOptions) -> Self {
        TcpHandler {
            addr: format!("{}:{}", host.into(), port),
            formatter: options.formatter(),
            conn: Mutex::new(None),
        }
    }

    /// Convenience constructor using the conventional collector port.
    pub fn with_default_port(host: impl Into<String>, options: EventOptions) -> Self {
        Self::new(host, DEFAULT_PORT, options)
    }
}

#[async_trait]
impl LogstashHandler for TcpHandler {
    async fn emit(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut payload = self.formatter.format(record)?;
        payload.push(b'\n');

        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(TcpStream::connect(self.addr.as_str()).await?);
        }
        if let Some(stream) = guard.as_mut() {
            if let Err(err) = stream.write_all(&payload).await {
                // Stale connection; reconnect on the next emit.
                guard.take();
                return Err(err.into());
            }
        }
        Ok(())
    }
}
