//! Prometheus metrics for the worker.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use crate::error::{WorkerError, WorkerResult};

pub mod names {
    pub const RUNS_TOTAL: &str = "vshort_runs_total";
    pub const CLIPS_TOTAL: &str = "vshort_clips_total";
    pub const STAGE_DURATION_SECONDS: &str = "vshort_stage_duration_seconds";
    pub const RUN_FAILURES_TOTAL: &str = "vshort_run_failures_total";
}

/// Start the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("metrics exporter: {e}")))?;
    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_run(outcome: &str) {
    counter!(names::RUNS_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

pub fn record_run_failure(stage: &str) {
    counter!(names::RUN_FAILURES_TOTAL, "stage" => stage.to_string()).increment(1);
}

pub fn record_clip(status: &str) {
    counter!(names::CLIPS_TOTAL, "status" => status.to_string()).increment(1);
}

pub fn record_stage_duration(stage: &str, secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage.to_string()).record(secs);
}
