//! Example: Running the engine against in-memory producers
//!
//! This example starts an [`Engine`] with a synthetic snapshot endpoint and a
//! synthetic push channel, then reads the merged state through a
//! `ChannelSource` the same way the TUI does.
//!
//! The push side sends a new count every second and drops the connection
//! every eighth frame, so the output shows the channel going offline and
//! reconnecting while polled samples keep arriving.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example scripted_engine
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;

use countwatch::sync::{PushConnector, PushFrame, PushStream, ReconnectPolicy, SnapshotClient};
use countwatch::{ChannelSource, CountSample, DataSource, Engine, EngineSettings, SyncError};

/// A counter that drifts up and down, shared by both producers.
#[derive(Debug, Default)]
struct Counter {
    ticks: AtomicU64,
}

impl Counter {
    fn next(&self) -> u64 {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed);
        10 + (tick * 7) % 13
    }
}

#[derive(Debug)]
struct SyntheticEndpoint {
    counter: Arc<Counter>,
}

#[async_trait]
impl SnapshotClient for SyntheticEndpoint {
    async fn fetch_current(&self) -> Result<CountSample, SyncError> {
        Ok(CountSample::new(Utc::now(), self.counter.next()))
    }

    async fn fetch_history(&self) -> Result<Vec<CountSample>, SyncError> {
        let now = Utc::now();
        Ok((1..=5)
            .map(|i| CountSample::new(now - chrono::Duration::seconds(i * 10), 10 + i as u64))
            .collect())
    }

    fn description(&self) -> &str {
        "poll: synthetic"
    }
}

#[derive(Debug)]
struct SyntheticPush {
    counter: Arc<Counter>,
}

#[async_trait]
impl PushConnector for SyntheticPush {
    async fn connect(&self) -> Result<PushStream, SyncError> {
        let counter = Arc::clone(&self.counter);
        let stream = futures_util::stream::unfold(0u32, move |sent| {
            let counter = Arc::clone(&counter);
            async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                let frame = if sent == 7 {
                    PushFrame::Close
                } else {
                    PushFrame::Text(format!(
                        r#"{{"count": {}, "timestamp": "{}"}}"#,
                        counter.next(),
                        Utc::now().to_rfc3339()
                    ))
                };
                Some((Ok(frame), sent + 1))
            }
        });
        Ok(stream.boxed())
    }

    fn description(&self) -> &str {
        "push: synthetic"
    }
}

#[tokio::main]
async fn main() {
    println!("Scripted engine example");
    println!("Merging synthetic poll and push samples for 20 seconds...\n");

    let counter = Arc::new(Counter::default());
    let settings = EngineSettings {
        poll_interval: Duration::from_secs(2),
        reconnect: ReconnectPolicy {
            delay: Duration::from_secs(3),
            max_attempts: None,
        },
        ..Default::default()
    };
    let engine = Engine::start(
        settings,
        Arc::new(SyntheticEndpoint {
            counter: Arc::clone(&counter),
        }),
        Arc::new(SyntheticPush { counter }),
    );

    let mut source = ChannelSource::from_engine(&engine);
    println!("Source: {}\n", source.description());

    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    while tokio::time::Instant::now() < deadline {
        if let Some(snapshot) = source.poll() {
            println!(
                "count {:>3}  peak {:>3}  avg {:>3}  samples {:>3}  {:?}",
                snapshot.current_count,
                snapshot.peak,
                snapshot.average,
                snapshot.retained,
                snapshot.connection
            );
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    engine.stop().await;
    if let Some(snapshot) = source.poll() {
        println!("\nFinal: {} ({:?})", snapshot.current_count, snapshot.connection);
    }
}
