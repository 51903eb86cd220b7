use crate::handler::LogstashHandler;
use crate::layer::LogstashLayer;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the logging layer.
///
/// **Fields**
/// - `channel_buffer`: maximum number of [`LogRecord`]s queued before
///   new records are dropped.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt` layer is
///   stacked on top of [`LogstashLayer`] so events also reach the
///   console.
///
/// [`LogRecord`]: crate::record::LogRecord
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel_buffer: usize,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            enable_stdout: true,
        }
    }
}

/// Initialize the global `tracing` subscriber using the provided handler
/// and [`LayerConfig`].
///
/// **Parameters**
/// - `handler`: implementation of [`LogstashHandler`] that will receive
///   formatted events.
/// - `config`: [`LayerConfig`] controlling the channel buffer and
///   console echo.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`LogstashLayer`] as the global
/// default subscriber, so all `tracing` events in the process are
/// observed by the layer. Must be called from within a Tokio runtime,
/// since the layer spawns its emit task there.
pub fn init_tracing_with_config(handler: Arc<dyn LogstashHandler>, config: LayerConfig) {
    let (layer, _handle) = LogstashLayer::new(handler, config.channel_buffer);

    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    }
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LayerConfig::default`].
pub fn init_tracing(handler: Arc<dyn LogstashHandler>) {
    init_tracing_with_config(handler, LayerConfig::default());
}
