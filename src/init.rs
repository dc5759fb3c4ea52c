use crate::error::LoggerError;
use crate::layer::ShipLayer;
use crate::logger::Logger;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Install a global `tracing` subscriber that forwards events to `logger`.
///
/// **Parameters**
/// - `logger`: the [`Logger`] events are shipped through. A clone is kept
///   by the installed layer.
/// - `min_level`: least severe `tracing` level forwarded.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`ShipLayer`] as the global
/// default subscriber. When the logger's configuration has
/// `enable_stdout = true`, a `tracing_subscriber::fmt` layer is added as
/// well, so events (including the shipper's own diagnostics) are printed to
/// the console.
pub fn init_tracing_with_level(logger: &Logger, min_level: Level) -> Result<(), LoggerError> {
    let layer = ShipLayer::new(logger.clone()).with_min_level(min_level);

    let installed = if logger.config().enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)
    };

    installed.map_err(|e| LoggerError::Subscriber(e.to_string()))
}

/// Install the global subscriber forwarding `INFO` and above.
///
/// Equivalent to [`init_tracing_with_level`] with [`Level::INFO`].
pub fn init_tracing(logger: &Logger) -> Result<(), LoggerError> {
    init_tracing_with_level(logger, Level::INFO)
}

/// Build a VictoriaLogs logger from the process environment and install it
/// as the global `tracing` subscriber.
///
/// This is the recommended entrypoint for typical microservices; the
/// returned logger can be used directly and must be closed on shutdown.
#[cfg(feature = "victorialogs")]
pub fn init_from_env() -> Result<Logger, LoggerError> {
    let config = crate::config::ShipperConfig::from_env()?;
    let logger = Logger::new(config)?;
    init_tracing(&logger)?;
    Ok(logger)
}
