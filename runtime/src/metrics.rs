//! Prometheus metrics for observability and monitoring.
//!
//! The Store records reducer and effect metrics through the `metrics` facade;
//! reducers add their own domain counters. Nothing is exported until a
//! recorder is installed.
//!
//! # Example
//!
//! ```rust,no_run
//! use lifecycle_runtime::metrics::install_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_recorder()?;
//!
//! // ... run stores ...
//!
//! println!("{}", handle.render());
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install a Prometheus recorder and return the handle used to render it.
///
/// # Errors
///
/// Returns [`MetricsError::Build`] if the histogram buckets are rejected and
/// [`MetricsError::Install`] if a global recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.000_01, 0.000_1, 0.001, 0.01, 0.1, 1.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    tracing::info!("Prometheus recorder installed");

    Ok(handle)
}

/// Register all metric descriptions.
pub fn register_metrics() {
    // Store metrics
    describe_counter!("store.commands.total", "Total number of actions reduced by stores");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside reducers while holding the state lock"
    );
    describe_histogram!("store.effects.count", "Number of effects returned per action");
    describe_counter!("store.effects.executed", "Effects executed, labelled by type");
    describe_counter!("store.shutdown.initiated", "Graceful shutdowns started");
    describe_counter!("store.shutdown.completed", "Graceful shutdowns that drained all effects");
    describe_counter!("store.shutdown.timeout", "Graceful shutdowns that timed out");
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );

    // Request lifecycle metrics
    describe_counter!("request.fetch.started", "Fetch operations started");
    describe_counter!("request.fetch.ignored", "Fetch triggers ignored while loading");
    describe_counter!("request.fetch.succeeded", "Fetch operations that succeeded");
    describe_counter!("request.fetch.failed", "Fetch operations that failed");
    describe_counter!(
        "request.signals.stale",
        "Completion signals discarded because their generation was superseded"
    );
}
