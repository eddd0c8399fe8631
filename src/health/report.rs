// src/health/report.rs
use super::record::{ResourceName, ResourceStatus};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReportItem {
    pub name: ResourceName,
    pub status: ResourceStatus,
}

impl HealthReportItem {
    pub fn new(name: ResourceName, status: ResourceStatus) -> Self {
        Self { name, status }
    }
}

/// Point-in-time snapshot of every monitored resource.
#[derive(Debug, Clone)]
pub struct HealthReport {
    created: DateTime<Utc>,
    items: Vec<HealthReportItem>,
}

impl HealthReport {
    pub fn new(items: Vec<HealthReportItem>) -> Self {
        Self::with_timestamp(Utc::now(), items)
    }

    pub fn with_timestamp(created: DateTime<Utc>, items: Vec<HealthReportItem>) -> Self {
        Self { created, items }
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn items(&self) -> &[HealthReportItem] {
        &self.items
    }

    /// True when no resource is healthy. Such a report is not forwarded.
    pub fn is_unhealthy(&self) -> bool {
        self.items
            .iter()
            .all(|item| item.status == ResourceStatus::Unhealthy)
    }

    pub fn healthy_count(&self) -> usize {
        self.items.iter().filter(|item| item.status.is_healthy()).count()
    }
}
