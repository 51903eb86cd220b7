use std::sync::Arc;

use tracing_logstash_sink::handler::EventOptions;
use tracing_logstash_sink::http::{HttpConfig, HttpHandler};
use tracing_logstash_sink::init::{init_tracing_with_config, LayerConfig};

#[tokio::main]
async fn main() {
    let handler = Arc::new(HttpHandler::new(HttpConfig {
        url: "http://127.0.0.1:5959".to_string(),
        username: std::env::var("LOGSTASH_USERNAME").ok(),
        password: std::env::var("LOGSTASH_PASSWORD").ok(),
        options: EventOptions::default(),
    }));
    init_tracing_with_config(
        handler,
        LayerConfig {
            channel_buffer: 256,
            enable_stdout: true,
        },
    );

    tracing::warn!(cache = "orders", "cache miss rate above threshold");

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
}
