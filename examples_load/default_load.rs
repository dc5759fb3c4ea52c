use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;

use log_shipper::noop_sink::NoopSink;
use log_shipper::{fields, Context, FlushMode, Logger, ShipperConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ShipperConfig {
        buffer_size: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        flush_mode: FlushMode::Batched,
        enable_stdout: false,
        ..Default::default()
    };
    let logger = Logger::with_sink(config, Arc::new(NoopSink))?;
    let ctx = Context::background();

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        logger.error(&ctx, "load test error", fields! { "iteration" => i });
    }

    let elapsed = start.elapsed();
    println!(
        "sent {} entries in {:?} (~{:.0} entries/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    logger.close().await?;
    let stats = logger.stats();
    println!(
        "enqueued {} dropped {} batches {}",
        stats.enqueued, stats.dropped, stats.delivered_batches
    );
    Ok(())
}
