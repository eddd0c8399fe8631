// src/monitor/observer.rs
use super::polling::PollingLoop;
use super::prober::ResourceProber;
use super::{panic_message, MonitorError};
use crate::health::{HealthRegistry, ResourceName};
use crate::metrics::MetricsCollector;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

type LoopFuture = BoxFuture<'static, Result<Infallible, MonitorError>>;
type LoopStarter = Box<dyn FnOnce(CancellationToken) -> LoopFuture + Send>;

/// Runs one polling loop per monitored resource and supervises them as a unit.
pub struct FanOutObserver {
    loops: Vec<(ResourceName, LoopStarter)>,
}

impl FanOutObserver {
    pub fn new(loops: Vec<PollingLoop>) -> Self {
        loops.into_iter().fold(Self { loops: Vec::new() }, |observer, polling| {
            let resource = polling.record().name().clone();
            observer.with_loop(resource, move |token| polling.run(token))
        })
    }

    /// Supervise an additional loop for `resource`. `run` receives the token
    /// shared by all supervised loops.
    pub fn with_loop<F, Fut>(mut self, resource: ResourceName, run: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Infallible, MonitorError>> + Send + 'static,
    {
        let start: LoopStarter = Box::new(move |token| run(token).boxed());
        self.loops.push((resource, start));
        self
    }

    /// Build one loop per registry record, all sharing the same prober.
    pub fn from_registry(
        registry: &HealthRegistry,
        prober: Arc<dyn ResourceProber>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        let loops = registry
            .records()
            .iter()
            .map(|record| PollingLoop::new(record.clone(), prober.clone(), metrics.clone()))
            .collect();

        Self::new(loops)
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Run every loop until the token is cancelled.
    ///
    /// Returns `MonitorError::Cancelled` after an orderly shutdown. A loop that
    /// dies any other way is fatal: the remaining loops are cancelled and
    /// `MonitorError::LoopCrashed` is returned.
    pub async fn observe(self, token: CancellationToken) -> Result<Infallible, MonitorError> {
        if token.is_cancelled() {
            return Err(MonitorError::Cancelled);
        }

        info!(resources = self.loops.len(), "Starting resources observer");

        // Child token lets a crashed loop take its siblings down without
        // cancelling the caller's token.
        let loops_token = token.child_token();
        let mut running: FuturesUnordered<_> = self
            .loops
            .into_iter()
            .map(|(resource, run)| {
                let handle = tokio::spawn(run(loops_token.clone()));
                async move { (resource, handle.await) }
            })
            .collect();

        let mut fatal: Option<MonitorError> = None;

        while let Some((resource, joined)) = running.next().await {
            let failure = match joined {
                Ok(Ok(never)) => match never {},
                Ok(Err(MonitorError::Cancelled)) => {
                    debug!(%resource, "Polling loop stopped");
                    continue;
                }
                Ok(Err(e)) => crashed(resource, e.to_string()),
                Err(e) if e.is_panic() => crashed(resource, panic_message(&*e.into_panic())),
                Err(e) => crashed(resource, e.to_string()),
            };

            if fatal.is_none() {
                error!(error = %failure, "Polling loop failed, stopping all loops");
                loops_token.cancel();
                fatal = Some(failure);
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => {
                info!("Resources observer stopped");
                Err(MonitorError::Cancelled)
            }
        }
    }
}

fn crashed(resource: ResourceName, reason: String) -> MonitorError {
    MonitorError::LoopCrashed { resource, reason }
}
