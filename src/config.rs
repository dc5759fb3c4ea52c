use crate::env::*;
use crate::error::LoggerError;
use crate::record::LogLevel;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound accepted for [`ShipperConfig::max_retries`].
pub const MAX_RETRIES_LIMIT: u32 = 100;

/// How the background worker turns dequeued entries into batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Flush as soon as an entry is dequeued. Every entry travels in its own
    /// delivery call unless the interval trigger finds a pending batch first.
    #[default]
    PerEntry,
    /// Accumulate until `batch_size` entries are pending or the flush
    /// interval elapses, whichever comes first.
    Batched,
}

impl FromStr for FlushMode {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_entry" | "per-entry" | "immediate" => Ok(FlushMode::PerEntry),
            "batched" | "batch" => Ok(FlushMode::Batched),
            other => Err(LoggerError::InvalidConfig(format!("unknown flush mode: {other}"))),
        }
    }
}

/// Shipper configuration, read once at construction and shared read-only.
///
/// **Fields**
/// - `url`: VictoriaLogs `jsonline` ingestion URL.
/// - `service_name`: service attributed to the root logger's entries.
/// - `batch_size`: maximum entries per delivery call.
/// - `flush_interval`: period of the interval trigger.
/// - `max_retries`: additional attempts after a failed delivery, at most
///   [`MAX_RETRIES_LIMIT`].
/// - `timeout`: bound for each individual attempt.
/// - `buffer_size`: ingestion buffer capacity before entries are dropped.
/// - `async_mode`: `false` bypasses the buffer and delivers inline.
/// - `flush_mode`: see [`FlushMode`].
/// - `retry_backoff`: delay after failed attempt `i` is `(i + 1) * retry_backoff`.
/// - `min_level`: entries below this level are discarded at the call site.
/// - `stream_fields`: VictoriaLogs stream fields appended to the URL.
/// - `enable_stdout`: whether [`crate::init`] installs a console `fmt` layer.
#[derive(Clone, Debug)]
pub struct ShipperConfig {
    pub url: String,
    pub service_name: String,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub max_retries: u32,
    pub timeout: Duration,
    pub buffer_size: usize,
    pub async_mode: bool,
    pub flush_mode: FlushMode,
    pub retry_backoff: Duration,
    pub min_level: LogLevel,
    pub stream_fields: Vec<String>,
    pub enable_stdout: bool,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9428/insert/jsonline".to_string(),
            service_name: "default-service".to_string(),
            batch_size: 100,
            flush_interval: Duration::from_secs(5),
            max_retries: 3,
            timeout: Duration::from_secs(30),
            buffer_size: 1000,
            async_mode: true,
            flush_mode: FlushMode::PerEntry,
            retry_backoff: Duration::from_secs(1),
            min_level: LogLevel::Debug,
            stream_fields: Vec::new(),
            enable_stdout: true,
        }
    }
}

impl ShipperConfig {
    /// Defaults overridden by whatever `LOG_SHIPPER_*` / `VICTORIA_LOGS_URL`
    /// variables are set in the process environment.
    pub fn from_env() -> Result<Self, LoggerError> {
        Self::from_lookup(env_var)
    }

    /// Same as [`ShipperConfig::from_env`] but reading values through
    /// `lookup`, so callers can source them from anywhere.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoggerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ShipperConfig::default();

        if let Some(url) = lookup(VICTORIA_LOGS_URL_ENV) {
            config.url = url;
        }
        if let Some(name) = lookup(LOG_SHIPPER_SERVICE_NAME_ENV) {
            config.service_name = name;
        }
        if let Some(v) = lookup(LOG_SHIPPER_BATCH_SIZE_ENV) {
            config.batch_size = parse(LOG_SHIPPER_BATCH_SIZE_ENV, &v)?;
        }
        if let Some(v) = lookup(LOG_SHIPPER_FLUSH_INTERVAL_MS_ENV) {
            config.flush_interval = Duration::from_millis(parse(LOG_SHIPPER_FLUSH_INTERVAL_MS_ENV, &v)?);
        }
        if let Some(v) = lookup(LOG_SHIPPER_MAX_RETRIES_ENV) {
            config.max_retries = parse(LOG_SHIPPER_MAX_RETRIES_ENV, &v)?;
        }
        if let Some(v) = lookup(LOG_SHIPPER_TIMEOUT_MS_ENV) {
            config.timeout = Duration::from_millis(parse(LOG_SHIPPER_TIMEOUT_MS_ENV, &v)?);
        }
        if let Some(v) = lookup(LOG_SHIPPER_BUFFER_SIZE_ENV) {
            config.buffer_size = parse(LOG_SHIPPER_BUFFER_SIZE_ENV, &v)?;
        }
        if let Some(v) = lookup(LOG_SHIPPER_ASYNC_ENV) {
            config.async_mode = parse_bool(LOG_SHIPPER_ASYNC_ENV, &v)?;
        }
        if let Some(v) = lookup(LOG_SHIPPER_FLUSH_MODE_ENV) {
            config.flush_mode = v.parse()?;
        }
        if let Some(v) = lookup(LOG_SHIPPER_RETRY_BACKOFF_MS_ENV) {
            config.retry_backoff = Duration::from_millis(parse(LOG_SHIPPER_RETRY_BACKOFF_MS_ENV, &v)?);
        }
        if let Some(v) = lookup(LOG_SHIPPER_LEVEL_ENV) {
            config.min_level = v
                .parse()
                .map_err(|e| LoggerError::InvalidConfig(format!("{LOG_SHIPPER_LEVEL_ENV}: {e}")))?;
        }
        if let Some(v) = lookup(LOG_SHIPPER_STREAM_FIELDS_ENV) {
            config.stream_fields = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup(LOG_SHIPPER_STDOUT_ENV) {
            config.enable_stdout = parse_bool(LOG_SHIPPER_STDOUT_ENV, &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the shipper cannot run with.
    pub fn validate(&self) -> Result<(), LoggerError> {
        let invalid = |msg: &str| Err(LoggerError::InvalidConfig(msg.to_string()));

        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return invalid("url must start with http:// or https://");
        }
        if self.service_name.is_empty() {
            return invalid("service_name must not be empty");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1");
        }
        if self.buffer_size == 0 {
            return invalid("buffer_size must be at least 1");
        }
        if self.flush_interval.is_zero() {
            return invalid("flush_interval must be greater than zero");
        }
        if self.timeout.is_zero() {
            return invalid("timeout must be greater than zero");
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(LoggerError::InvalidConfig(format!(
                "max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                self.max_retries
            )));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, LoggerError> {
    value
        .trim()
        .parse()
        .map_err(|_| LoggerError::InvalidConfig(format!("{key}: cannot parse {value:?}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, LoggerError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(LoggerError::InvalidConfig(format!("{key}: expected a boolean, got {value:?}"))),
    }
}
