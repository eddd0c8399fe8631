// src/monitor/mod.rs
mod observer;
mod polling;
mod prober;
mod reporter;

pub use observer::FanOutObserver;
pub use polling::PollingLoop;
pub use prober::{HttpProber, ProbeError, ResourceProber};
pub use reporter::ReportLoop;

use crate::health::ResourceName;
use std::any::Any;

/// Why a monitoring loop stopped. Loops have no normal completion, so a
/// cancelled shutdown is also reported through this type.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Monitoring cancelled")]
    Cancelled,

    #[error("Polling loop for resource '{resource}' crashed: {reason}")]
    LoopCrashed {
        resource: ResourceName,
        reason: String,
    },
}

impl MonitorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MonitorError::Cancelled)
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
