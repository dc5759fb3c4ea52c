//! Environment variable names used by this crate for convenient
//! configuration of the shipper from microservices.
//!
//! These are purely helpers; [`crate::config::ShipperConfig`] can always be
//! built from explicit values instead.

/// VictoriaLogs ingestion URL, e.g. `http://127.0.0.1:9428/insert/jsonline`.
pub const VICTORIA_LOGS_URL_ENV: &str = "VICTORIA_LOGS_URL";

/// Service name attributed to entries of the root logger.
pub const LOG_SHIPPER_SERVICE_NAME_ENV: &str = "LOG_SHIPPER_SERVICE_NAME";

/// Maximum number of entries per delivery call.
pub const LOG_SHIPPER_BATCH_SIZE_ENV: &str = "LOG_SHIPPER_BATCH_SIZE";

/// Interval trigger period, in milliseconds.
pub const LOG_SHIPPER_FLUSH_INTERVAL_MS_ENV: &str = "LOG_SHIPPER_FLUSH_INTERVAL_MS";

/// Additional attempts after a failed delivery.
pub const LOG_SHIPPER_MAX_RETRIES_ENV: &str = "LOG_SHIPPER_MAX_RETRIES";

/// Per-attempt network timeout, in milliseconds.
pub const LOG_SHIPPER_TIMEOUT_MS_ENV: &str = "LOG_SHIPPER_TIMEOUT_MS";

/// Ingestion buffer capacity, in entries.
pub const LOG_SHIPPER_BUFFER_SIZE_ENV: &str = "LOG_SHIPPER_BUFFER_SIZE";

/// `true` for the buffered background worker, `false` for inline delivery.
pub const LOG_SHIPPER_ASYNC_ENV: &str = "LOG_SHIPPER_ASYNC";

/// `per_entry` or `batched`.
pub const LOG_SHIPPER_FLUSH_MODE_ENV: &str = "LOG_SHIPPER_FLUSH_MODE";

/// Unit of the linear retry backoff, in milliseconds.
pub const LOG_SHIPPER_RETRY_BACKOFF_MS_ENV: &str = "LOG_SHIPPER_RETRY_BACKOFF_MS";

/// Minimum level shipped, e.g. `INFO`.
pub const LOG_SHIPPER_LEVEL_ENV: &str = "LOG_SHIPPER_LEVEL";

/// Comma-separated VictoriaLogs stream fields, e.g. `service,level`.
pub const LOG_SHIPPER_STREAM_FIELDS_ENV: &str = "LOG_SHIPPER_STREAM_FIELDS";

/// Whether [`crate::init`] also prints diagnostics to stdout.
pub const LOG_SHIPPER_STDOUT_ENV: &str = "LOG_SHIPPER_STDOUT";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating unset and non-unicode the same.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
