use thiserror::Error;

/// Errors surfaced to whoever issues requests against the monitor.
///
/// Failed health checks are not errors; they become
/// [`CheckOutcome::Offline`](crate::CheckOutcome::Offline).
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Site already monitored: {0}")]
    DuplicateSite(String),
    #[error("Site not found: {0}")]
    NotFound(String),
    #[error("Site already scheduled: {0}")]
    AlreadyScheduled(String),
    #[error("Invalid site: {0}")]
    InvalidSite(String),
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
