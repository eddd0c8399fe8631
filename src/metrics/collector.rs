// src/metrics/collector.rs
use crate::health::{HealthReport, ResourceStatus};
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        buffer
    }
}

/// Outcome label for a single probe attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    Unhealthy,
    Error,
}

impl ProbeOutcome {
    fn as_label(self) -> &'static str {
        match self {
            ProbeOutcome::Healthy => "healthy",
            ProbeOutcome::Unhealthy => "unhealthy",
            ProbeOutcome::Error => "error",
        }
    }
}

/// Outcome of one report cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Sent,
    Failed,
    Skipped,
}

impl ReportOutcome {
    fn as_label(self) -> &'static str {
        match self {
            ReportOutcome::Sent => "sent",
            ReportOutcome::Failed => "failed",
            ReportOutcome::Skipped => "skipped",
        }
    }
}

pub struct MetricsCollector {
    // Probe metrics
    pub probes_total: IntCounterVec,
    pub probe_duration_seconds: HistogramVec,

    // Resource metrics
    pub resource_health_status: IntGaugeVec,
    pub monitored_resources: IntGauge,

    // Report metrics
    pub reports_total: IntCounterVec,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let probes_total = IntCounterVec::new(
            Opts::new("rhm_probes_total", "Total number of resource probes"),
            &["resource", "outcome"],
        )?;
        registry.register(Box::new(probes_total.clone()))?;

        let probe_duration_seconds = HistogramVec::new(
            HistogramOpts::new("rhm_probe_duration_seconds", "Probe duration in seconds"),
            &["resource"],
        )?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;

        let resource_health_status = IntGaugeVec::new(
            Opts::new(
                "rhm_resource_health_status",
                "Resource health status in the last report (1=healthy, 0=unhealthy)",
            ),
            &["resource"],
        )?;
        registry.register(Box::new(resource_health_status.clone()))?;

        let monitored_resources =
            IntGauge::new("rhm_monitored_resources", "Number of monitored resources")?;
        registry.register(Box::new(monitored_resources.clone()))?;

        let reports_total = IntCounterVec::new(
            Opts::new("rhm_reports_total", "Total number of report cycles"),
            &["outcome"],
        )?;
        registry.register(Box::new(reports_total.clone()))?;

        Ok(Self {
            probes_total,
            probe_duration_seconds,
            resource_health_status,
            monitored_resources,
            reports_total,
        })
    }

    pub fn record_probe(&self, resource: &str, outcome: ProbeOutcome, duration: Duration) {
        self.probes_total
            .with_label_values(&[resource, outcome.as_label()])
            .inc();

        self.probe_duration_seconds
            .with_label_values(&[resource])
            .observe(duration.as_secs_f64());
    }

    pub fn record_report(&self, report: &HealthReport, outcome: ReportOutcome) {
        for item in report.items() {
            let value = if item.status == ResourceStatus::Healthy { 1 } else { 0 };
            self.resource_health_status
                .with_label_values(&[item.name.as_str()])
                .set(value);
        }

        self.reports_total
            .with_label_values(&[outcome.as_label()])
            .inc();
    }

    pub fn set_monitored_resources(&self, count: usize) {
        self.monitored_resources.set(count as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HealthReportItem, ResourceName};

    #[test]
    fn test_report_outcome_is_exported() {
        let registry = MetricsRegistry::new().unwrap();
        let collector = registry.collector();

        let report = HealthReport::new(vec![
            HealthReportItem::new(ResourceName::new("billing").unwrap(), ResourceStatus::Healthy),
            HealthReportItem::new(ResourceName::new("search").unwrap(), ResourceStatus::Unhealthy),
        ]);
        collector.record_report(&report, ReportOutcome::Sent);
        collector.record_probe("billing", ProbeOutcome::Healthy, Duration::from_millis(12));

        let text = String::from_utf8(registry.gather()).unwrap();
        assert!(text.contains(r#"rhm_reports_total{outcome="sent"} 1"#));
        assert!(text.contains(r#"rhm_resource_health_status{resource="billing"} 1"#));
        assert!(text.contains(r#"rhm_resource_health_status{resource="search"} 0"#));
        assert!(text
            .lines()
            .any(|line| line.starts_with("rhm_probes_total{")
                && line.contains(r#"outcome="healthy""#)
                && line.contains(r#"resource="billing""#)));
    }
}
