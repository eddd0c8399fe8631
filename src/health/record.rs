// src/health/record.rs
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Resource name cannot be empty")]
    EmptyName,

    #[error("Resource name cannot be whitespace")]
    BlankName,

    #[error("{0} must be greater than zero")]
    NonPositive(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceStatus {
    Unhealthy,
    Healthy,
}

impl ResourceStatus {
    pub fn is_healthy(self) -> bool {
        self == ResourceStatus::Healthy
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceStatus::Healthy => f.write_str("healthy"),
            ResourceStatus::Unhealthy => f.write_str("unhealthy"),
        }
    }
}

/// Identity of a monitored resource. Two names with the same text are the same resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceName(String);

impl ResourceName {
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModelError::EmptyName);
        }
        if name.trim().is_empty() {
            return Err(ModelError::BlankName);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How a resource is probed: where, how long to wait, how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSettings {
    address: Url,
    timeout: Duration,
    check_interval: Duration,
}

impl RequestSettings {
    pub fn new(address: Url, timeout: Duration, check_interval: Duration) -> Result<Self, ModelError> {
        if timeout.is_zero() {
            return Err(ModelError::NonPositive("Timeout"));
        }
        if check_interval.is_zero() {
            return Err(ModelError::NonPositive("Check interval"));
        }

        Ok(Self {
            address,
            timeout,
            check_interval,
        })
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }
}

/// Freshness cell for one monitored resource.
///
/// The last successful probe is kept as Unix microseconds in a single atomic,
/// so readers never need a lock and never observe a partial write. Only the
/// owning polling loop calls [`update`](Self::update), which advances the
/// timestamp with `fetch_max` rather than a plain store: a wall clock stepping
/// backwards must not make a resource look staler than it is.
#[derive(Debug)]
pub struct ResourceHealthRecord {
    name: ResourceName,
    expiration_period: Duration,
    request_settings: RequestSettings,
    last_success_micros: AtomicI64,
}

impl ResourceHealthRecord {
    pub fn new(
        name: ResourceName,
        expiration_period: Duration,
        request_settings: RequestSettings,
    ) -> Self {
        Self {
            name,
            expiration_period,
            request_settings,
            last_success_micros: AtomicI64::new(DateTime::<Utc>::UNIX_EPOCH.timestamp_micros()),
        }
    }

    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    pub fn expiration_period(&self) -> Duration {
        self.expiration_period
    }

    pub fn request_settings(&self) -> &RequestSettings {
        &self.request_settings
    }

    /// Publish the current instant as the last successful probe.
    pub fn update(&self) {
        // fetch_max keeps the timestamp monotonic if the wall clock steps back
        self.last_success_micros
            .fetch_max(Utc::now().timestamp_micros(), Ordering::AcqRel);
    }

    pub fn last_success_at(&self) -> DateTime<Utc> {
        let micros = self.last_success_micros.load(Ordering::Acquire);
        DateTime::from_timestamp_micros(micros).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn status(&self) -> ResourceStatus {
        self.status_at(Utc::now())
    }

    /// Healthy iff `last_success_at + expiration_period >= now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> ResourceStatus {
        let last = self.last_success_micros.load(Ordering::Acquire);
        let period = i64::try_from(self.expiration_period.as_micros()).unwrap_or(i64::MAX);

        if last.saturating_add(period) >= now.timestamp_micros() {
            ResourceStatus::Healthy
        } else {
            ResourceStatus::Unhealthy
        }
    }
}

impl fmt::Display for ResourceHealthRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (last success: {}, expiration: {:?})",
            self.name,
            self.last_success_at(),
            self.expiration_period
        )
    }
}
