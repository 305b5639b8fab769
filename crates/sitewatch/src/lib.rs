//! sitewatch - periodic reachability checks for user-registered sites
//!
//! The crate keeps a set of sites, runs one recurring timer per site at that
//! site's cadence, probes each site over HTTP and tells observers whenever a
//! site's state changes. Presentation is left to the caller, which drives a
//! [`SiteMonitor`] and listens to [`MonitorEvent`]s.
//!
//! ```no_run
//! use sitewatch::{IntervalUnit, SiteMonitor, Config};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut monitor = SiteMonitor::from_config(&Config::default())?;
//! let mut events = monitor.subscribe();
//!
//! monitor.add_site("Example", "https://example.com", IntervalUnit::Minutes).await?;
//! while let Ok(event) = events.recv().await {
//!     if let Some(message) = event.message() {
//!         println!("{message}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod checker;
pub mod config;
pub mod error;
pub mod monitor;
pub mod notifier;
pub mod registry;
pub mod scheduler;
pub mod types;
pub mod validation;

pub use checker::{Checker, HttpChecker};
pub use config::{Config, ConfigError};
pub use error::{MonitorError, Result};
pub use monitor::SiteMonitor;
pub use notifier::{MonitorEvent, Notifier};
pub use registry::{SharedRegistry, SiteRegistry};
pub use scheduler::MonitoringScheduler;
pub use types::{Cadence, CheckOutcome, IntervalUnit, OfflineReason, Site, SiteStatus};
