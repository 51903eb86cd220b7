use std::sync::Arc;

use tracing_logstash_sink::formatter::SchemaVersion;
use tracing_logstash_sink::handler::EventOptions;
use tracing_logstash_sink::init::init_tracing;
use tracing_logstash_sink::udp::UdpHandler;

#[tokio::main]
async fn main() {
    let options = EventOptions {
        message_type: "logstash".to_string(),
        tags: vec!["demo".to_string()],
        fqdn: false,
        version: SchemaVersion::V1,
    };
    let handler = Arc::new(UdpHandler::with_default_port("127.0.0.1", options));
    init_tracing(handler);

    tracing::info!(user_id = 7i64, "application started");
    tracing::error!(request = "GET /orders", "upstream timed out");

    // Give the background emit task a moment before the process exits.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
}
