#![forbid(unsafe_code)]

pub mod api;
pub mod http;
pub mod memory;
pub mod reports;

pub use api::{AnswerSubmission, GatewayError, HealthApi};
pub use http::{ApiConfig, HttpApi};
pub use memory::{Endpoint, InMemoryApi};
pub use reports::{FileReportDelivery, ReportDelivery, ReportError};
