#![allow(dead_code)]

use async_trait::async_trait;
use log_shipper::sink::LogSink;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};
use tokio::time::{sleep, timeout, Duration};

/// Records every payload it accepts; optionally fails every call.
#[derive(Default)]
pub struct RecordingSink {
    payloads: Mutex<Vec<String>>,
    calls: Mutex<usize>,
    always_fail: bool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(RecordingSink {
            always_fail: true,
            ..Default::default()
        })
    }

    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    /// `_msg` of every delivered line, in delivery order.
    pub fn messages(&self) -> Vec<String> {
        self.payloads()
            .iter()
            .flat_map(|p| p.lines().map(str::to_string).collect::<Vec<_>>())
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(&line).unwrap();
                value["_msg"].as_str().unwrap().to_string()
            })
            .collect()
    }
}

#[async_trait]
impl LogSink for RecordingSink {
    async fn send(&self, payload: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        *self.calls.lock().unwrap() += 1;
        if self.always_fail {
            return Err("ingestion endpoint unavailable".into());
        }
        self.payloads.lock().unwrap().push(payload.to_string());
        Ok(())
    }
}

/// Holds every delivery until the test opens the gate.
pub struct GatedSink {
    pub inner: Arc<RecordingSink>,
    pub started: Notify,
    gate: Semaphore,
}

impl GatedSink {
    pub fn new() -> Arc<Self> {
        Arc::new(GatedSink {
            inner: RecordingSink::new(),
            started: Notify::new(),
            gate: Semaphore::new(0),
        })
    }

    pub fn open(&self) {
        self.gate.add_permits(1_000);
    }
}

#[async_trait]
impl LogSink for GatedSink {
    async fn send(&self, payload: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.started.notify_one();
        self.gate.acquire().await?.forget();
        self.inner.send(payload).await
    }
}

/// Poll `condition` until it holds, panicking after five seconds.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    let poll = async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    };
    if timeout(Duration::from_secs(5), poll).await.is_err() {
        panic!("condition not reached in time");
    }
}

/// Panics on the first delivery, taking the worker task down with it.
pub struct PanickingSink;

#[async_trait]
impl LogSink for PanickingSink {
    async fn send(&self, _payload: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        panic!("sink blew up");
    }
}
