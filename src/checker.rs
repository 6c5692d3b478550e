//! Per-candidate checking: probe, time, attribute failures, inspect.
//!
//! [`StreamChecker`] is what every worker runs for one candidate. It wraps
//! the protocol dispatch in a uniform timeout, measures end-to-end latency,
//! records failing hosts, and asks the media inspector for the resolution
//! of reachable streams.

use crate::{
    host_of, CheckerError, Candidate, Config, FfprobeInspector, HostFailureCounter, MediaInspector,
    Metrics, ProbeResult, ProberRegistry, Protocol,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Slack on top of the per-protocol timeout before the outer guard fires.
const TIMEOUT_GRACE: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct StreamChecker {
    config: Arc<Config>,
    registry: Arc<ProberRegistry>,
    inspector: Arc<dyn MediaInspector>,
    host_failures: HostFailureCounter,
    metrics: Arc<Metrics>,
}

impl StreamChecker {
    pub fn new(
        config: Config,
        registry: ProberRegistry,
        inspector: Arc<dyn MediaInspector>,
        host_failures: HostFailureCounter,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            inspector,
            host_failures,
            metrics,
        }
    }

    /// Checker wired with the built-in probers and the ffprobe inspector.
    pub fn from_config(
        config: Config,
        host_failures: HostFailureCounter,
        metrics: Arc<Metrics>,
    ) -> Result<Self, CheckerError> {
        let registry = ProberRegistry::from_config(&config)?;
        let inspector = Arc::new(FfprobeInspector::new(config.ffprobe_path.clone()));
        Ok(Self::new(config, registry, inspector, host_failures, metrics))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn host_failures(&self) -> &HostFailureCounter {
        &self.host_failures
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Probe one candidate. Never fails: errors become an unreachable result.
    pub async fn check(&self, candidate: Candidate) -> ProbeResult {
        let protocol = Protocol::from_url(&candidate.url);
        let check_timeout = self.config.check_timeout;
        self.metrics.probes_started.increment(1);

        let start = Instant::now();
        let outcome = if protocol.is_supported() {
            match timeout(
                check_timeout + TIMEOUT_GRACE,
                self.registry.probe(protocol, &candidate.url, check_timeout),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(CheckerError::Timeout(check_timeout)),
            }
        } else {
            warn!("Unsupported protocol: {}", candidate.url);
            Ok(false)
        };
        let elapsed = start.elapsed();

        let (reachable, elapsed_ms, error) = match outcome {
            Ok(reachable) => (reachable, Some(crate::duration_to_ms(elapsed)), None),
            Err(e) => {
                warn!("Probe error for {}: {}", candidate.url, e);
                self.host_failures.record(&host_of(&candidate.url));
                (false, None, Some(e))
            }
        };
        self.metrics.record_probe(elapsed, reachable, error.is_some());

        let resolution = if reachable && self.config.inspect_resolution {
            let resolution = self
                .inspector
                .inspect(&candidate.url, self.config.inspect_timeout)
                .await;
            if resolution.is_none() {
                self.metrics.record_inspection_failure();
            }
            resolution
        } else {
            None
        };

        debug!(
            "Checked {}: reachable={}, elapsed={:?}, resolution={}",
            candidate.url,
            reachable,
            elapsed_ms,
            resolution.map(|r| r.to_string()).unwrap_or_else(|| "N/A".to_string())
        );

        ProbeResult {
            name: candidate.name,
            url: candidate.url,
            protocol,
            reachable,
            elapsed_ms,
            resolution,
            error,
        }
    }
}
