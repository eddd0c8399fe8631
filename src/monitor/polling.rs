// src/monitor/polling.rs
use super::prober::{ProbeError, ResourceProber};
use super::{panic_message, MonitorError};
use crate::health::{ResourceHealthRecord, ResourceStatus};
use crate::metrics::{MetricsCollector, ProbeOutcome};
use futures::FutureExt;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

/// Drives one record: probe, publish on success, sleep, repeat.
///
/// The loop owns the only write access to its record. It never finishes on its
/// own; the only way out is the cancellation token.
pub struct PollingLoop {
    record: Arc<ResourceHealthRecord>,
    prober: Arc<dyn ResourceProber>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl PollingLoop {
    pub fn new(
        record: Arc<ResourceHealthRecord>,
        prober: Arc<dyn ResourceProber>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            record,
            prober,
            metrics,
        }
    }

    pub fn record(&self) -> &Arc<ResourceHealthRecord> {
        &self.record
    }

    pub async fn run(self, token: CancellationToken) -> Result<Infallible, MonitorError> {
        let span = info_span!("poll", resource = %self.record.name());
        self.run_until_cancelled(&token).instrument(span).await
    }

    async fn run_until_cancelled(&self, token: &CancellationToken) -> Result<Infallible, MonitorError> {
        let interval = self.record.request_settings().check_interval();
        debug!(?interval, "Starting polling loop");

        loop {
            if token.is_cancelled() {
                debug!("Polling loop cancelled");
                return Err(MonitorError::Cancelled);
            }

            self.probe_once(token).await?;

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("Polling loop cancelled while sleeping");
                    return Err(MonitorError::Cancelled);
                }
                _ = sleep(interval) => {}
            }
        }
    }

    /// Run a single probe and publish the result. Only cancellation of `token`
    /// is returned as an error; every other failure is logged and absorbed,
    /// including a prober reporting cancellation on a live token.
    pub async fn probe_once(&self, token: &CancellationToken) -> Result<(), MonitorError> {
        let settings = self.record.request_settings();
        let start = Instant::now();

        let result = AssertUnwindSafe(self.prober.probe(settings.timeout(), settings.address(), token))
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(Ok(ResourceStatus::Healthy)) => {
                self.record.update();
                debug!("Resource is healthy");
                ProbeOutcome::Healthy
            }
            Ok(Ok(ResourceStatus::Unhealthy)) => {
                debug!("Resource is unhealthy");
                ProbeOutcome::Unhealthy
            }
            Ok(Err(ProbeError::Cancelled)) if token.is_cancelled() => {
                return Err(MonitorError::Cancelled)
            }
            Ok(Err(e)) => {
                warn!(resource = %self.record.name(), error = %e, "Error while checking resource");
                ProbeOutcome::Error
            }
            Err(panic) => {
                warn!(
                    resource = %self.record.name(),
                    panic = %panic_message(&*panic),
                    "Probe panicked while checking resource"
                );
                ProbeOutcome::Error
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_probe(self.record.name().as_str(), outcome, start.elapsed());
        }

        Ok(())
    }
}
