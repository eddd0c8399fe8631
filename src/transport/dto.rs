// src/transport/dto.rs
//
// Wire format of the report sent to the collector.
//
use crate::health::{HealthReport, HealthReportItem, ResourceStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthReportDto<'a> {
    pub timestamp: DateTime<Utc>,
    pub resources: Vec<HealthReportItemDto<'a>>,
}

#[derive(Debug, Serialize)]
pub struct HealthReportItemDto<'a> {
    pub resource_name: &'a str,
    /// 0 = unhealthy, 1 = healthy
    pub resource_status: u8,
}

impl<'a> From<&'a HealthReport> for HealthReportDto<'a> {
    fn from(report: &'a HealthReport) -> Self {
        Self {
            timestamp: report.created(),
            resources: report.items().iter().map(HealthReportItemDto::from).collect(),
        }
    }
}

impl<'a> From<&'a HealthReportItem> for HealthReportItemDto<'a> {
    fn from(item: &'a HealthReportItem) -> Self {
        Self {
            resource_name: item.name.as_str(),
            resource_status: wire_status(item.status),
        }
    }
}

fn wire_status(status: ResourceStatus) -> u8 {
    match status {
        ResourceStatus::Unhealthy => 0,
        ResourceStatus::Healthy => 1,
    }
}

pub fn serialize_report(report: &HealthReport) -> serde_json::Result<String> {
    serde_json::to_string(&HealthReportDto::from(report))
}
