use std::sync::Arc;

use async_trait::async_trait;
use log_shipper::{fields, sink::LogSink, Context, Logger, ShipperConfig};

/// Example of integrating a completely custom backend by implementing
/// the `LogSink` trait directly. Imagine this talks to some
/// proprietary collector for which this crate does not provide a built-in
/// sink.
struct StdoutSink;

#[async_trait]
impl LogSink for StdoutSink {
    async fn send(&self, payload: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Here you would call your own client library for the target store.
        // For the sake of example we just print the NDJSON lines.
        print!("[stdout-sink] {}", payload);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sink: Arc<dyn LogSink> = Arc::new(StdoutSink);
    let logger = Logger::with_sink(ShipperConfig::default(), sink)?;

    let ctx = Context::background().with_trace_id("trace_custom_1");
    logger.info(&ctx, "custom backend example started", fields! {});
    logger.error(&ctx, "simulated error sent via custom backend", fields! { "db" => "my-custom-db" });

    logger.close().await?;
    Ok(())
}
