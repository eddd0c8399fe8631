// src/transport/mod.rs
mod dto;
mod sender;

pub use dto::{serialize_report, HealthReportDto, HealthReportItemDto};
pub use sender::{HttpReportSender, ReportSender, SendError};
