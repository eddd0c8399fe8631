// src/monitor/reporter.rs
use super::{panic_message, MonitorError};
use crate::health::HealthRegistry;
use crate::metrics::{MetricsCollector, ReportOutcome};
use crate::transport::{ReportSender, SendError};
use futures::FutureExt;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodically snapshots the registry and forwards the report.
///
/// A report in which every resource is unhealthy is skipped. Failed sends are
/// not retried; the loop simply waits for the next interval.
pub struct ReportLoop {
    registry: Arc<HealthRegistry>,
    sender: Arc<dyn ReportSender>,
    send_interval: Duration,
    metrics: Option<Arc<MetricsCollector>>,
}

impl ReportLoop {
    pub fn new(
        registry: Arc<HealthRegistry>,
        sender: Arc<dyn ReportSender>,
        send_interval: Duration,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            registry,
            sender,
            send_interval,
            metrics,
        }
    }

    pub async fn run(self, token: CancellationToken) -> Result<Infallible, MonitorError> {
        info!(interval = ?self.send_interval, "Starting report loop");

        loop {
            if token.is_cancelled() {
                info!("Report loop cancelled");
                return Err(MonitorError::Cancelled);
            }

            self.process_once(&token).await?;

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!("Report loop cancelled while sleeping");
                    return Err(MonitorError::Cancelled);
                }
                _ = sleep(self.send_interval) => {}
            }
        }
    }

    /// Build one report and send it unless every resource is unhealthy.
    pub async fn process_once(&self, token: &CancellationToken) -> Result<ReportOutcome, MonitorError> {
        debug!("Building report");
        let report = self.registry.build_report();

        let outcome = if report.is_unhealthy() {
            warn!(
                resources = report.items().len(),
                "All resources in the report are unhealthy, skip sending"
            );
            ReportOutcome::Skipped
        } else {
            debug!(
                healthy = report.healthy_count(),
                resources = report.items().len(),
                "Sending report"
            );

            match AssertUnwindSafe(self.sender.send(&report, token))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {
                    info!("Report processed");
                    ReportOutcome::Sent
                }
                Ok(Err(SendError::Cancelled)) if token.is_cancelled() => {
                    return Err(MonitorError::Cancelled)
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "Report was not delivered");
                    ReportOutcome::Failed
                }
                Err(panic) => {
                    warn!(panic = %panic_message(&*panic), "Report sender panicked");
                    ReportOutcome::Failed
                }
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_report(&report, outcome);
        }

        Ok(outcome)
    }
}
