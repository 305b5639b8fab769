use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{MonitorError, Result};
use crate::types::{Cadence, CheckOutcome, Site};

/// Registry shared between the monitor and its timer tasks
pub type SharedRegistry = Arc<RwLock<SiteRegistry>>;

/// In-memory set of monitored sites, keyed by URL and kept in insertion order.
///
/// The registry never touches timers or performs I/O.
#[derive(Debug, Default)]
pub struct SiteRegistry {
    sites: Vec<Site>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Register a new site with `unknown` status
    pub fn add(
        &mut self,
        name: impl Into<String>,
        url: impl Into<String>,
        cadence: Cadence,
    ) -> Result<Site> {
        let url = url.into();
        if self.contains(&url) {
            return Err(MonitorError::DuplicateSite(url));
        }

        let site = Site::new(name.into(), url, cadence);
        self.sites.push(site.clone());
        Ok(site)
    }

    /// Drop every site, returning how many there were. Timers must already
    /// be stopped.
    pub fn clear(&mut self) -> usize {
        let count = self.sites.len();
        self.sites.clear();
        count
    }

    /// Remove a site. Its timer must already be stopped.
    pub fn remove(&mut self, url: &str) -> Result<Site> {
        let index = self
            .position(url)
            .ok_or_else(|| MonitorError::NotFound(url.to_string()))?;
        Ok(self.sites.remove(index))
    }

    pub fn get(&self, url: &str) -> Option<&Site> {
        self.sites.iter().find(|site| site.url() == url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.position(url).is_some()
    }

    /// Sites in the order they were added
    pub fn list(&self) -> &[Site] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Record a check outcome. Returns `None` when the site is gone.
    pub(crate) fn apply(&mut self, url: &str, outcome: &CheckOutcome) -> Option<Site> {
        let site = self.sites.iter_mut().find(|site| site.url() == url)?;
        site.apply(outcome);
        Some(site.clone())
    }

    fn position(&self, url: &str) -> Option<usize> {
        self.sites.iter().position(|site| site.url() == url)
    }
}
