// src/config/models.rs
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Path the admin server answers liveness probes on.
pub const LIVENESS_PATH: &str = "/hc";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("At least one resource configuration must be provided")]
    NoResources,

    #[error("Resource name '{0}' is not set")]
    MissingName(String),

    #[error("Resource name '{0}' is not valid")]
    BlankName(String),

    #[error("Resource name '{0}' is not unique")]
    DuplicateName(String),

    #[error("{field} for resource '{resource}' must be positive")]
    NonPositive { resource: String, field: &'static str },

    #[error("Report {0} must be positive")]
    NonPositiveReport(&'static str),

    #[error("Metrics path '{0}' must start with '/' and differ from the liveness path")]
    InvalidMetricsPath(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub resources: Vec<ResourceConfig>,
    pub report: ReportConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
    pub url: Url,
    pub expiration_secs: u64,
    pub check_interval_secs: u64,
    pub timeout_ms: u64,
}

impl ResourceConfig {
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub url: Url,
    pub send_interval_secs: u64,
    #[serde(default = "default_report_timeout_ms")]
    pub timeout_ms: u64,
}

impl ReportConfig {
    pub fn send_interval(&self) -> Duration {
        Duration::from_secs(self.send_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_enabled")]
    pub enabled: bool,
    #[serde(default = "default_admin_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: default_admin_enabled(),
            port: default_admin_port(),
            metrics_path: default_metrics_path(),
        }
    }
}

fn default_report_timeout_ms() -> u64 {
    5000
}

fn default_admin_enabled() -> bool {
    true
}

fn default_admin_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resources.is_empty() {
            return Err(ConfigError::NoResources);
        }

        let mut names = HashSet::new();
        for resource in &self.resources {
            resource.validate()?;

            if !names.insert(resource.name.as_str()) {
                return Err(ConfigError::DuplicateName(resource.name.clone()));
            }
        }

        if self.report.send_interval_secs == 0 {
            return Err(ConfigError::NonPositiveReport("send interval"));
        }
        if self.report.timeout_ms == 0 {
            return Err(ConfigError::NonPositiveReport("timeout"));
        }

        let path = &self.admin.metrics_path;
        if !path.starts_with('/') || path == LIVENESS_PATH {
            return Err(ConfigError::InvalidMetricsPath(path.clone()));
        }

        Ok(())
    }
}

impl ResourceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::MissingName(self.name.clone()));
        }
        if self.name.trim().is_empty() {
            return Err(ConfigError::BlankName(self.name.clone()));
        }

        let non_positive = |field| ConfigError::NonPositive {
            resource: self.name.clone(),
            field,
        };
        if self.expiration_secs == 0 {
            return Err(non_positive("Expiration period"));
        }
        if self.check_interval_secs == 0 {
            return Err(non_positive("Check interval"));
        }
        if self.timeout_ms == 0 {
            return Err(non_positive("Timeout"));
        }

        Ok(())
    }
}
