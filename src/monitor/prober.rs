// src/monitor/prober.rs
use crate::health::ResourceStatus;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Probe cancelled")]
    Cancelled,

    #[error("Probe timeout must be greater than zero")]
    InvalidTimeout,

    #[error("Probe failed: {0}")]
    Failed(String),
}

/// One bounded reachability check against one resource.
///
/// Network failures, timeouts and non-success responses are reported as
/// `Ok(ResourceStatus::Unhealthy)`. Errors are reserved for misuse and
/// cancellation.
#[async_trait]
pub trait ResourceProber: Send + Sync {
    async fn probe(
        &self,
        timeout: Duration,
        address: &Url,
        token: &CancellationToken,
    ) -> Result<ResourceStatus, ProbeError>;
}

/// Probes a resource with an HTTP GET; any 2xx counts as healthy.
#[derive(Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResourceProber for HttpProber {
    async fn probe(
        &self,
        probe_timeout: Duration,
        address: &Url,
        token: &CancellationToken,
    ) -> Result<ResourceStatus, ProbeError> {
        if token.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }
        if probe_timeout.is_zero() {
            return Err(ProbeError::InvalidTimeout);
        }

        let request = self.client.get(address.clone()).send();

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(ProbeError::Cancelled),
            result = timeout(probe_timeout, request) => result,
        };

        let status = match result {
            Ok(Ok(response)) if response.status().is_success() => ResourceStatus::Healthy,
            Ok(Ok(response)) => {
                debug!(%address, status = %response.status(), "Probe got non-success response");
                ResourceStatus::Unhealthy
            }
            Ok(Err(e)) => {
                debug!(%address, error = %e, "Probe request failed");
                ResourceStatus::Unhealthy
            }
            Err(_) => {
                debug!(%address, timeout = ?probe_timeout, "Probe timed out");
                ResourceStatus::Unhealthy
            }
        };

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn health_url(server: &mockito::Server) -> Url {
        Url::parse(&format!("{}/health", server.url())).unwrap()
    }

    #[tokio::test]
    async fn test_success_response_is_healthy() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body("OK")
            .create_async()
            .await;

        let prober = HttpProber::new().unwrap();
        let status = prober
            .probe(Duration::from_secs(2), &health_url(&server), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(status, ResourceStatus::Healthy);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_response_is_unhealthy() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/health")
            .with_status(503)
            .with_body("Unhealthy")
            .create_async()
            .await;

        let prober = HttpProber::new().unwrap();
        let status = prober
            .probe(Duration::from_secs(2), &health_url(&server), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(status, ResourceStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unhealthy() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let prober = HttpProber::new().unwrap();
        let url = Url::parse(&format!("http://{}/health", addr)).unwrap();
        let status = prober
            .probe(Duration::from_secs(2), &url, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(status, ResourceStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_silent_server_times_out_as_unhealthy() {
        // Accepts the connection but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _accept = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let prober = HttpProber::new().unwrap();
        let url = Url::parse(&format!("http://{}/health", addr)).unwrap();
        let status = prober
            .probe(Duration::from_millis(100), &url, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(status, ResourceStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_cancellation_is_not_unhealthy() {
        let prober = HttpProber::new().unwrap();
        let url = Url::parse("http://127.0.0.1:1/health").unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let result = prober.probe(Duration::from_secs(1), &url, &token).await;
        assert!(matches!(result, Err(ProbeError::Cancelled)));
    }

    #[tokio::test]
    async fn test_zero_timeout_is_rejected() {
        let prober = HttpProber::new().unwrap();
        let url = Url::parse("http://127.0.0.1:1/health").unwrap();

        let result = prober.probe(Duration::ZERO, &url, &CancellationToken::new()).await;
        assert!(matches!(result, Err(ProbeError::InvalidTimeout)));
    }
}
