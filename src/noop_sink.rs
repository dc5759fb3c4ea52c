use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;

/// A sink that accepts and discards every payload.
///
/// Useful for measuring the overhead of the shipper itself without any
/// external I/O.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _payload: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
