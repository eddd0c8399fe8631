// src/health/registry.rs
use super::record::{ModelError, RequestSettings, ResourceHealthRecord, ResourceName};
use super::report::{HealthReport, HealthReportItem};
use crate::config::ResourceConfig;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Resource health records cannot be empty")]
    Empty,

    #[error("Resource name '{0}' is not unique")]
    DuplicateName(ResourceName),

    #[error("Invalid resource '{name}': {source}")]
    InvalidResource {
        name: String,
        #[source]
        source: ModelError,
    },
}

/// Fixed set of monitored resources, built once at startup.
///
/// The record list is never mutated after construction, so it can be iterated
/// from any task while polling loops publish into the individual records.
#[derive(Debug)]
pub struct HealthRegistry {
    records: Vec<Arc<ResourceHealthRecord>>,
}

impl HealthRegistry {
    pub fn new(records: Vec<ResourceHealthRecord>) -> Result<Self, RegistryError> {
        if records.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut names = HashSet::with_capacity(records.len());
        for record in &records {
            if !names.insert(record.name()) {
                return Err(RegistryError::DuplicateName(record.name().clone()));
            }
        }

        Ok(Self {
            records: records.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn from_config(resources: &[ResourceConfig]) -> Result<Self, RegistryError> {
        let records = resources
            .iter()
            .map(|config| {
                build_record(config).map_err(|source| RegistryError::InvalidResource {
                    name: config.name.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(records)
    }

    pub fn records(&self) -> &[Arc<ResourceHealthRecord>] {
        &self.records
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ResourceHealthRecord>> {
        self.records.iter().find(|record| record.name().as_str() == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot every record's status. Each read is lock-free; items may reflect
    /// slightly different instants relative to each other.
    pub fn build_report(&self) -> HealthReport {
        let items = self
            .records
            .iter()
            .map(|record| HealthReportItem::new(record.name().clone(), record.status()))
            .collect();

        HealthReport::new(items)
    }
}

fn build_record(config: &ResourceConfig) -> Result<ResourceHealthRecord, ModelError> {
    let name = ResourceName::new(config.name.as_str())?;
    let settings = RequestSettings::new(config.url.clone(), config.timeout(), config.check_interval())?;
    Ok(ResourceHealthRecord::new(name, config.expiration(), settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ResourceStatus;
    use std::time::Duration;
    use url::Url;

    fn record(name: &str) -> ResourceHealthRecord {
        let settings = RequestSettings::new(
            Url::parse("http://localhost:8001/health").unwrap(),
            Duration::from_secs(1),
            Duration::from_secs(5),
        )
        .unwrap();
        ResourceHealthRecord::new(ResourceName::new(name).unwrap(), Duration::from_secs(5), settings)
    }

    #[test]
    fn test_empty_registry_fails() {
        assert!(matches!(HealthRegistry::new(vec![]), Err(RegistryError::Empty)));
    }

    #[test]
    fn test_duplicate_names_fail() {
        let result = HealthRegistry::new(vec![record("a"), record("a")]);
        match result {
            Err(RegistryError::DuplicateName(name)) => assert_eq!(name.as_str(), "a"),
            other => panic!("expected duplicate name error, got {:?}", other),
        }
    }

    #[test]
    fn test_distinct_names_succeed() {
        let registry = HealthRegistry::new(vec![record("a"), record("b")]).unwrap();
        assert_eq!(registry.records().len(), 2);
        assert!(registry.get("a").is_some());
        assert!(registry.get("c").is_none());
    }

    #[test]
    fn test_build_report_has_one_item_per_record() {
        let registry = HealthRegistry::new(vec![record("a"), record("b"), record("c")]).unwrap();
        registry.get("b").unwrap().update();

        let report = registry.build_report();
        assert_eq!(report.items().len(), 3);

        let status_of = |name: &str| {
            report
                .items()
                .iter()
                .find(|item| item.name.as_str() == name)
                .map(|item| item.status)
        };
        assert_eq!(status_of("a"), Some(ResourceStatus::Unhealthy));
        assert_eq!(status_of("b"), Some(ResourceStatus::Healthy));
        assert_eq!(status_of("c"), Some(ResourceStatus::Unhealthy));
    }

    #[test]
    fn test_from_config_rejects_blank_name() {
        let config = ResourceConfig {
            name: "   ".to_string(),
            url: Url::parse("http://localhost/health").unwrap(),
            expiration_secs: 5,
            check_interval_secs: 1,
            timeout_ms: 500,
        };
        let result = HealthRegistry::from_config(&[config]);
        assert!(matches!(
            result,
            Err(RegistryError::InvalidResource { source: ModelError::BlankName, .. })
        ));
    }
}
