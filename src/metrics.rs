use crate::CheckerError;
use metrics::{register_counter, register_histogram, Counter, Histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use tracing::info;

pub struct Metrics {
    pub probes_started: Counter,
    pub probes_reachable: Counter,
    pub probes_unreachable: Counter,
    pub probe_errors: Counter,
    pub probe_duration: Histogram,
    pub candidates_skipped: Counter,
    pub inspections_failed: Counter,
    pub task_panics: Counter,
}

impl Metrics {
    /// Handles bound to the installed recorder, or no-ops when none is installed.
    pub fn new() -> Self {
        Self {
            probes_started: register_counter!("stream_checker_probes_started_total"),
            probes_reachable: register_counter!("stream_checker_probes_reachable_total"),
            probes_unreachable: register_counter!("stream_checker_probes_unreachable_total"),
            probe_errors: register_counter!("stream_checker_probe_errors_total"),
            probe_duration: register_histogram!("stream_checker_probe_duration_seconds"),
            candidates_skipped: register_counter!("stream_checker_candidates_skipped_total"),
            inspections_failed: register_counter!("stream_checker_inspections_failed_total"),
            task_panics: register_counter!("stream_checker_task_panics_total"),
        }
    }

    pub fn noop() -> Self {
        Self {
            probes_started: Counter::noop(),
            probes_reachable: Counter::noop(),
            probes_unreachable: Counter::noop(),
            probe_errors: Counter::noop(),
            probe_duration: Histogram::noop(),
            candidates_skipped: Counter::noop(),
            inspections_failed: Counter::noop(),
            task_panics: Counter::noop(),
        }
    }

    pub fn record_probe(&self, duration: Duration, reachable: bool, errored: bool) {
        if reachable {
            self.probes_reachable.increment(1);
        } else {
            self.probes_unreachable.increment(1);
        }

        if errored {
            self.probe_errors.increment(1);
        }

        self.probe_duration.record(duration.as_secs_f64());
    }

    pub fn record_skipped(&self, count: usize) {
        self.candidates_skipped.increment(count as u64);
    }

    pub fn record_inspection_failure(&self) {
        self.inspections_failed.increment(1);
    }

    pub fn record_panic(&self) {
        self.task_panics.increment(1);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs a Prometheus recorder so the run's metrics can be rendered as text.
pub struct PrometheusExporter {
    handle: PrometheusHandle,
}

impl PrometheusExporter {
    /// Must be called before [`Metrics::new`] for the handles to be captured.
    pub fn install() -> Result<Self, CheckerError> {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::set_boxed_recorder(Box::new(recorder))
            .map_err(|e| CheckerError::Metrics(e.to_string()))?;

        info!("Prometheus metrics recorder installed");
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }
}
