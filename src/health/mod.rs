// src/health/mod.rs
mod record;
mod registry;
mod report;

pub use record::{ModelError, RequestSettings, ResourceHealthRecord, ResourceName, ResourceStatus};
pub use registry::{HealthRegistry, RegistryError};
pub use report::{HealthReport, HealthReportItem};
