use crate::formatter::EventFormatter;
use crate::handler::{EventOptions, LogstashHandler};
use crate::record::LogRecord;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;

/// Configuration for [`HttpHandler`].
///
/// Targets a Logstash HTTP input that accepts the serialized event as a
/// `json=<document>` form body. Credentials, when given, are sent as a
/// Basic-Auth header.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Full collector URL, e.g. "http://127.0.0.1:5959".
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub options: EventOptions,
}

/// HTTP implementation of [`LogstashHandler`].
pub struct HttpHandler {
    client: Client,
    url: String,
    username: Option<String>,
    password: Option<String>,
    formatter: Box<dyn EventFormatter>,
}

impl HttpHandler {
    /// Construct a new handler from the provided configuration.
    ///
    /// **Parameters**
    /// - `config`: [`HttpConfig`] describing target URL, optional
    ///   credentials and the event options shared by all transports.
    pub fn new(config: HttpConfig) -> Self {
        let formatter = config.options.formatter();
        HttpHandler {
            client: Client::new(),
            url: config.url,
            username: config.username,
            password: config.password,
            formatter,
        }
    }

    /// `json=` followed by the serialized document, matching the form
    /// body the collector's HTTP input expects.
    fn make_body(&self, record: &LogRecord) -> Result<Vec<u8>, serde_json::Error> {
        let mut body = b"json=".to_vec();
        body.extend(self.formatter.format(record)?);
        Ok(body)
    }
}

#[async_trait]
impl LogstashHandler for HttpHandler {
    async fn emit(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let body = self.make_body(record)?;

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body);
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            request = request.basic_auth(username, Some(password));
        }

        // Fire-and-forget: response status and body are ignored.
        request.send().await?;
        Ok(())
    }
}
