// src/transport/sender.rs
use super::dto::serialize_report;
use crate::health::HealthReport;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Send cancelled")]
    Cancelled,

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Collector responded with HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Ships a built report to the collector.
///
/// Ordinary delivery failures are returned as values and never retried here;
/// `SendError::Cancelled` is reserved for the cancellation token firing.
#[async_trait]
pub trait ReportSender: Send + Sync {
    async fn send(&self, report: &HealthReport, token: &CancellationToken) -> Result<(), SendError>;
}

pub struct HttpReportSender {
    client: Client,
    destination: Url,
}

impl HttpReportSender {
    pub fn new(destination: Url, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            destination,
        })
    }
}

#[async_trait]
impl ReportSender for HttpReportSender {
    async fn send(&self, report: &HealthReport, token: &CancellationToken) -> Result<(), SendError> {
        if token.is_cancelled() {
            return Err(SendError::Cancelled);
        }

        info!(
            destination = %self.destination,
            resources = report.items().len(),
            "Sending report"
        );

        let payload = serialize_report(report)?;
        debug!(%payload, "Report payload");

        let request = self
            .client
            .post(self.destination.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send();

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(SendError::Cancelled),
            result = request => result,
        };

        match result {
            Ok(response) if response.status().is_success() => {
                info!("Report sent");
                Ok(())
            }
            Ok(response) => {
                let status = response.status();
                warn!(
                    destination = %self.destination,
                    %status,
                    "Failed to send report"
                );
                Err(SendError::Status(status))
            }
            Err(e) => {
                warn!(
                    destination = %self.destination,
                    error = %e,
                    "Failed to send report"
                );
                Err(SendError::Transport(e.to_string()))
            }
        }
    }
}
