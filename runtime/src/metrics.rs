//! Prometheus metrics for the scoring service.
//!
//! The service always emits through the `metrics` facade; whether anything
//! is collected depends on the recorder the host process installs. Calling
//! [`MetricsRecorder::install`] sets up a Prometheus recorder whose output
//! can be rendered for scraping.
//!
//! # Example
//!
//! ```rust,no_run
//! use crease_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let recorder = MetricsRecorder::install()?;
//! // ... serve `recorder.render()` at /metrics
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
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

/// Installed Prometheus recorder.
pub struct MetricsRecorder {
    handle: PrometheusHandle,
}

impl MetricsRecorder {
    /// Describe the scoring metrics and install a Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::Install` if a recorder is already installed in
    /// this process.
    pub fn install() -> Result<Self, MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let handle = builder
            .install_recorder()
            .map_err(|e| MetricsError::Install(e.to_string()))?;
        register_metrics();
        tracing::info!("Scoring metrics recorder installed");
        Ok(Self { handle })
    }

    /// Render current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "scoring_balls_recorded_total",
        "Total number of deliveries appended to match logs"
    );
    describe_counter!("scoring_undo_total", "Total number of deliveries voided by undo");
    describe_counter!(
        "scoring_transitions_total",
        "Total number of match lifecycle transitions committed"
    );
    describe_counter!(
        "scoring_commands_rejected_total",
        "Total number of commands rejected by validation, by reason"
    );
    describe_counter!(
        "scoring_commit_conflicts_total",
        "Total number of commits rejected because another writer got there first"
    );
    describe_histogram!(
        "scoring_projection_duration_seconds",
        "Time taken to validate a command and re-derive the projection"
    );
}

/// Scoring metrics helpers.
pub struct ScoringMetrics;

impl ScoringMetrics {
    /// Record a committed delivery.
    pub fn record_ball() {
        counter!("scoring_balls_recorded_total").increment(1);
    }

    /// Record a committed undo.
    pub fn record_undo() {
        counter!("scoring_undo_total").increment(1);
    }

    /// Record a committed lifecycle or selection change.
    pub fn record_transition(command: &'static str) {
        counter!("scoring_transitions_total", "command" => command).increment(1);
    }

    /// Record a command that failed validation.
    pub fn record_rejection(command: &'static str, reason: &'static str) {
        counter!("scoring_commands_rejected_total", "command" => command, "reason" => reason)
            .increment(1);
    }

    /// Record a lost version race.
    pub fn record_conflict() {
        counter!("scoring_commit_conflicts_total").increment(1);
    }

    /// Record how long validation plus projection took.
    pub fn record_projection(duration: Duration) {
        histogram!("scoring_projection_duration_seconds").record(duration.as_secs_f64());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // The only test in this binary that installs a global recorder.
    #[test]
    fn recorder_renders_scoring_metrics() {
        let recorder = MetricsRecorder::install().unwrap();
        ScoringMetrics::record_ball();
        ScoringMetrics::record_rejection("record_ball", "precondition_failed");
        ScoringMetrics::record_projection(Duration::from_micros(250));

        let rendered = recorder.render();
        assert!(rendered.contains("scoring_balls_recorded_total"));
        assert!(rendered.contains("reason=\"precondition_failed\""));
        assert!(rendered.contains("scoring_projection_duration_seconds"));

        assert!(matches!(MetricsRecorder::install(), Err(MetricsError::Install(_))));
    }
}
