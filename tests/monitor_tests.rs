// tests/monitor_tests.rs
use async_trait::async_trait;
use resource_health_monitor::health::{
    HealthRegistry, HealthReport, RegistryError, RequestSettings, ResourceHealthRecord,
    ResourceName, ResourceStatus,
};
use resource_health_monitor::metrics::ReportOutcome;
use resource_health_monitor::monitor::{FanOutObserver, HttpProber, ReportLoop};
use resource_health_monitor::transport::{HttpReportSender, ReportSender, SendError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

struct CountingSender {
    sends: AtomicUsize,
}

#[async_trait]
impl ReportSender for CountingSender {
    async fn send(&self, _report: &HealthReport, _token: &CancellationToken) -> Result<(), SendError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn record(name: &str, address: &str, expiration: Duration, interval: Duration) -> ResourceHealthRecord {
    let settings = RequestSettings::new(
        Url::parse(address).unwrap(),
        Duration::from_secs(1),
        interval,
    )
    .unwrap();
    ResourceHealthRecord::new(ResourceName::new(name).unwrap(), expiration, settings)
}

fn two_resources() -> Arc<HealthRegistry> {
    let five = Duration::from_secs(5);
    Arc::new(
        HealthRegistry::new(vec![
            record("A", "http://localhost:8001/health", five, five),
            record("B", "http://localhost:8002/health", five, five),
        ])
        .unwrap(),
    )
}

fn status_of(report: &HealthReport, name: &str) -> Option<ResourceStatus> {
    report
        .items()
        .iter()
        .find(|item| item.name.as_str() == name)
        .map(|item| item.status)
}

#[test]
fn test_registry_construction_rules() {
    let one_sec = Duration::from_secs(1);

    assert!(matches!(HealthRegistry::new(vec![]), Err(RegistryError::Empty)));

    let duplicate = HealthRegistry::new(vec![
        record("A", "http://localhost:8001/", one_sec, one_sec),
        record("A", "http://localhost:8002/", one_sec, one_sec),
    ]);
    assert!(matches!(duplicate, Err(RegistryError::DuplicateName(_))));

    let registry = HealthRegistry::new(vec![
        record("A", "http://localhost:8001/", one_sec, one_sec),
        record("B", "http://localhost:8002/", one_sec, one_sec),
    ])
    .unwrap();
    assert_eq!(registry.records().len(), 2);
}

#[tokio::test]
async fn test_unprobed_resources_are_not_reported() {
    let registry = two_resources();
    let sender = Arc::new(CountingSender {
        sends: AtomicUsize::new(0),
    });

    let report = registry.build_report();
    assert_eq!(report.items().len(), 2);
    assert_eq!(status_of(&report, "A"), Some(ResourceStatus::Unhealthy));
    assert_eq!(status_of(&report, "B"), Some(ResourceStatus::Unhealthy));
    assert!(report.is_unhealthy());

    let reporter = ReportLoop::new(registry, sender.clone(), Duration::from_secs(1), None);
    let outcome = reporter.process_once(&CancellationToken::new()).await.unwrap();

    assert_eq!(outcome, ReportOutcome::Skipped);
    assert_eq!(sender.sends.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_one_healthy_resource_is_reported_once() {
    let registry = two_resources();
    let sender = Arc::new(CountingSender {
        sends: AtomicUsize::new(0),
    });

    registry.get("A").unwrap().update();

    let report = registry.build_report();
    assert_eq!(status_of(&report, "A"), Some(ResourceStatus::Healthy));
    assert_eq!(status_of(&report, "B"), Some(ResourceStatus::Unhealthy));
    assert!(!report.is_unhealthy());

    let reporter = ReportLoop::new(registry, sender.clone(), Duration::from_secs(1), None);
    let outcome = reporter.process_once(&CancellationToken::new()).await.unwrap();

    assert_eq!(outcome, ReportOutcome::Sent);
    assert_eq!(sender.sends.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_end_to_end_probe_and_report() {
    let mut resources = mockito::Server::new_async().await;
    let _up = resources
        .mock("GET", "/up")
        .with_status(200)
        .expect_at_least(1)
        .create_async()
        .await;
    let _down = resources
        .mock("GET", "/down")
        .with_status(503)
        .create_async()
        .await;

    let mut collector = mockito::Server::new_async().await;
    let reports = collector
        .mock("POST", "/reports")
        .match_header("content-type", "application/json")
        .with_status(202)
        .expect_at_least(1)
        .create_async()
        .await;

    let interval = Duration::from_millis(50);
    let expiration = Duration::from_secs(30);
    let registry = Arc::new(
        HealthRegistry::new(vec![
            record("up", &format!("{}/up", resources.url()), expiration, interval),
            record("down", &format!("{}/down", resources.url()), expiration, interval),
        ])
        .unwrap(),
    );

    let sender = HttpReportSender::new(
        Url::parse(&format!("{}/reports", collector.url())).unwrap(),
        Duration::from_secs(2),
    )
    .unwrap();
    let prober = Arc::new(HttpProber::new().unwrap());
    let token = CancellationToken::new();

    let observer = FanOutObserver::from_registry(&registry, prober, None);
    let reporter = ReportLoop::new(registry.clone(), Arc::new(sender), Duration::from_millis(100), None);

    let observer_task = tokio::spawn(observer.observe(token.clone()));
    let report_task = tokio::spawn(reporter.run(token.clone()));

    tokio::time::sleep(Duration::from_millis(500)).await;
    token.cancel();

    assert!(observer_task.await.unwrap().unwrap_err().is_cancelled());
    assert!(report_task.await.unwrap().unwrap_err().is_cancelled());

    assert_eq!(registry.get("up").unwrap().status(), ResourceStatus::Healthy);
    assert_eq!(registry.get("down").unwrap().status(), ResourceStatus::Unhealthy);
    reports.assert_async().await;
}
