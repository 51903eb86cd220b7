use crate::formatter::EventFormatter;
use crate::handler::{EventOptions, LogstashHandler, DEFAULT_PORT};
use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;

/// UDP implementation of [`LogstashHandler`].
///
/// One datagram per record: the serialized document plus a trailing
/// newline. The socket is bound on the first emit and reused.
pub struct UdpHandler {
    target: String,
    formatter: Box<dyn EventFormatter>,
    socket: Mutex<Option<UdpSocket>>,
}

impl UdpHandler {
    pub fn new(host: impl Into<String>, port: u16, options: EventOptions) -> Self {
        UdpHandler {
            target: format!("{}:{}", host.into(), port),
            formatter: options.formatter(),
            socket: Mutex::new(None),
        }
    }

    /// Convenience constructor using the conventional collector port.
    pub fn with_default_port(host: impl Into<String>, options: EventOptions) -> Self {
        Self::new(host, DEFAULT_PORT, options)
    }
}

#[async_trait]
impl LogstashHandler for UdpHandler {
    async fn emit(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut payload = self.formatter.format(record)?;
        payload.push(b'\n');

        let mut guard = self.socket.lock().await;
        if guard.is_none() {
            *guard = Some(UdpSocket::bind("0.0.0.0:0").await?);
        }
        if let Some(socket) = guard.as_ref() {
            socket.send_to(&payload, self.target.as_str()).await?;
        }
        Ok(())
    }
}
