// src/main.rs
use anyhow::{Context, Result};
use resource_health_monitor::{
    config::{self, Config},
    health::HealthRegistry,
    metrics::MetricsRegistry,
    monitor::{FanOutObserver, HttpProber, MonitorError, ReportLoop},
    server::{AdminHandler, ServerBuilder},
    transport::HttpReportSender,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const OBSERVER_TASK: &str = "Resources observer";
const REPORT_TASK: &str = "Report loop";

type LoopTask = JoinHandle<Result<Infallible, MonitorError>>;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("resource_health_monitor=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;

    run(config).await
}

async fn run(config: Config) -> Result<()> {
    let registry = Arc::new(
        HealthRegistry::from_config(&config.resources).context("Failed to build health registry")?,
    );
    info!(resources = registry.len(), "Health registry built");

    // Initialize metrics
    let metrics_registry = Arc::new(MetricsRegistry::new()?);
    let metrics = metrics_registry.collector();
    metrics.set_monitored_resources(registry.len());

    let prober = Arc::new(HttpProber::new().context("Failed to create probe HTTP client")?);
    let sender = Arc::new(
        HttpReportSender::new(config.report.url.clone(), config.report.timeout())
            .context("Failed to create report HTTP client")?,
    );

    let token = CancellationToken::new();

    let observer = FanOutObserver::from_registry(&registry, prober, Some(metrics.clone()));
    let report_loop = ReportLoop::new(
        registry.clone(),
        sender,
        config.report.send_interval(),
        Some(metrics.clone()),
    );

    let mut observer_task = tokio::spawn(observer.observe(token.clone()));
    let mut report_task = tokio::spawn(report_loop.run(token.clone()));

    let admin_task = if config.admin.enabled {
        let addr: SocketAddr = ([0, 0, 0, 0], config.admin.port).into();
        let handler = AdminHandler::new(metrics_registry, config.admin.metrics_path.as_str());
        let server = ServerBuilder::new(addr).with_handler(handler);
        Some(tokio::spawn(server.serve(token.clone())))
    } else {
        None
    };

    let (outcome, finished) = tokio::select! {
        _ = shutdown_signal() => (Ok(()), None),
        joined = &mut observer_task => (loop_exit(OBSERVER_TASK, joined), Some(OBSERVER_TASK)),
        joined = &mut report_task => (loop_exit(REPORT_TASK, joined), Some(REPORT_TASK)),
    };

    token.cancel();

    let outcome = drain_loops(
        outcome,
        finished,
        vec![(OBSERVER_TASK, observer_task), (REPORT_TASK, report_task)],
    )
    .await;

    if let Some(task) = admin_task {
        match task.await {
            Ok(Err(e)) => error!("Admin server error: {:#}", e),
            Err(e) => error!("Admin server task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }

    info!("Shutdown complete");
    outcome
}

/// Await every loop task except the one that already finished. The first
/// failure wins; a crash racing the shutdown signal is still reported.
async fn drain_loops(
    mut outcome: Result<()>,
    finished: Option<&str>,
    tasks: Vec<(&'static str, LoopTask)>,
) -> Result<()> {
    for (name, task) in tasks {
        if finished == Some(name) {
            continue;
        }
        let drained = loop_exit(name, task.await);
        if outcome.is_ok() {
            outcome = drained;
        }
    }
    outcome
}

fn loop_exit(
    name: &str,
    joined: Result<Result<Infallible, MonitorError>, JoinError>,
) -> Result<()> {
    match joined {
        Ok(Ok(never)) => match never {},
        Ok(Err(e)) if e.is_cancelled() => {
            info!("{} stopped", name);
            Ok(())
        }
        Ok(Err(e)) => {
            error!("{} failed: {}", name, e);
            Err(e.into())
        }
        Err(e) => {
            error!("{} task failed: {}", name, e);
            Err(e.into())
        }
    }
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
