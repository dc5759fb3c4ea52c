use crate::sink::LogSink;
use crate::wire::NDJSON_CONTENT_TYPE;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;

/// Configuration for [`VictoriaLogsSink`].
///
/// The sink talks to VictoriaLogs over HTTP using the `jsonline` ingestion
/// API, e.g. `http://localhost:9428/insert/jsonline`.
#[derive(Clone, Debug)]
pub struct VictoriaLogsConfig {
    /// Full ingestion URL, optionally with its own query string.
    pub url: String,
    /// Field names VictoriaLogs should use to build the log stream.
    pub stream_fields: Vec<String>,
    /// Upper bound for a single HTTP request.
    pub timeout: Duration,
}

/// VictoriaLogs implementation of [`LogSink`] using the HTTP interface.
#[derive(Clone)]
pub struct VictoriaLogsSink {
    client: Client,
    endpoint: String,
}

impl VictoriaLogsSink {
    /// Construct a new sink instance using the provided configuration.
    ///
    /// **Returns**
    /// - A ready-to-use [`VictoriaLogsSink`].
    /// - `Err(..)` if the underlying HTTP client could not be built.
    pub fn new(config: VictoriaLogsConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint(&config),
        })
    }

    /// Full ingestion URL, including the `_stream_fields` query when set.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn endpoint(config: &VictoriaLogsConfig) -> String {
    if config.stream_fields.is_empty() {
        return config.url.clone();
    }

    let separator = if config.url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}_stream_fields={}",
        config.url,
        separator,
        urlencoding::encode(&config.stream_fields.join(","))
    )
}

#[async_trait]
impl LogSink for VictoriaLogsSink {
    async fn send(&self, payload: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, NDJSON_CONTENT_TYPE)
            .body(payload.to_owned())
            .send()
            .await?;

        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(format!("VictoriaLogs returned status {}: {}", status, text).into())
        } else {
            Ok(())
        }
    }
}
