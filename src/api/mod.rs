pub mod client;
pub mod model;
pub mod types;
pub mod urls;

#[cfg(test)]
pub mod fake;

pub use client::ApiClient;
pub use model::{
    CreateInvestorRequest, GmailCandidate, HealthStatus, Investor, Job, JobReport, JobStatus,
};
pub use types::{ApiError, DeckApi, DeckUpload};
