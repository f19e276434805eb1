//! Request lifecycle demo binary
//!
//! Drives a lifecycle around a fake API that answers after a short delay and
//! fails some of the time, printing the state as it moves
//! idle → loading → success/error and retrying from error.

use lifecycle_runtime::metrics::install_recorder;
use rand::Rng;
use request_lifecycle::{DemoConfig, LifecycleConfig, RequestLifecycle, RequestStatus};
use serde::Serialize;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Payload returned by the fake API.
#[derive(Debug, Clone, Serialize)]
struct Message {
    msg: String,
}

/// An API that answers after `latency` and succeeds with probability `success_rate`.
#[derive(Debug, Clone, Copy)]
struct FakeApi {
    success_rate: f64,
    latency: Duration,
}

impl FakeApi {
    async fn fetch(self) -> Result<Message, String> {
        tokio::time::sleep(self.latency).await;

        if rand::thread_rng().gen_bool(self.success_rate) {
            Ok(Message {
                msg: "Done".to_string(),
            })
        } else {
            Err("Network error".to_string())
        }
    }
}

async fn print_state(lifecycle: &RequestLifecycle<Message, String>) -> anyhow::Result<()> {
    let phase = lifecycle.state().await;
    println!("STATE: {}", serde_json::to_string(&phase)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_lifecycle=debug,lifecycle_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let demo = DemoConfig::from_env()?;
    let config = LifecycleConfig::from_env()?;
    let metrics = if demo.metrics {
        Some(install_recorder()?)
    } else {
        None
    };

    println!("=== Request Lifecycle Demo ===\n");
    println!(
        "Fake API: {}ms latency, {:.0}% success rate, up to {} attempts\n",
        demo.latency_ms,
        demo.success_rate * 100.0,
        demo.attempts
    );

    let api = FakeApi {
        success_rate: demo.success_rate,
        latency: demo.latency(),
    };
    let lifecycle = RequestLifecycle::with_config(move || api.fetch(), config);
    let wait_limit = demo.latency() + Duration::from_secs(5);

    print_state(&lifecycle).await?;

    for attempt in 1..=demo.attempts {
        println!("\n>>> fetch (attempt {attempt})");
        let mut handle = lifecycle.fetch().await?;
        print_state(&lifecycle).await?;

        // A second trigger while loading is ignored
        lifecycle.fetch().await?;

        handle.wait_with_timeout(wait_limit).await?;
        print_state(&lifecycle).await?;

        if lifecycle.status().await == RequestStatus::Success {
            break;
        }
    }

    let snapshot = lifecycle.snapshot().await;
    println!(
        "\nFinished as {} after {} invocation(s)",
        snapshot.status(),
        snapshot.invocations()
    );

    lifecycle.shutdown_default().await?;

    if let Some(handle) = metrics {
        println!("\n=== Metrics ===\n{}", handle.render());
    }

    Ok(())
}
