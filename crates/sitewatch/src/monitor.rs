use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::checker::{Checker, HttpChecker};
use crate::config::Config;
use crate::error::{MonitorError, Result};
use crate::notifier::{MonitorEvent, Notifier};
use crate::registry::{SharedRegistry, SiteRegistry};
use crate::scheduler::{CheckContext, MonitoringScheduler};
use crate::types::{Cadence, CheckOutcome, Site};
use crate::validation::validate_site;

/// Entry point for everything outside the core: accepts add, remove,
/// check and stop requests and keeps registry and timers in step.
///
/// Registry, checker and notifier are injected; nothing is process-global.
pub struct SiteMonitor {
    registry: SharedRegistry,
    scheduler: MonitoringScheduler,
    context: CheckContext,
    notifier: Notifier,
}

impl SiteMonitor {
    pub fn new(checker: Arc<dyn Checker>, notifier: Notifier) -> Self {
        let registry = SiteRegistry::new().shared();
        let context = CheckContext::new(registry.clone(), checker, notifier.clone());

        Self {
            registry,
            scheduler: MonitoringScheduler::new(context.clone()),
            context,
            notifier,
        }
    }

    /// Build a monitor with an HTTP checker configured from `config`.
    ///
    /// Sites listed in the config are not registered here; see
    /// [`SiteMonitor::register_configured_sites`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let checker = HttpChecker::from_config(&config.checker)?;
        Ok(Self::new(Arc::new(checker), Notifier::new(config.notifier.event_buffer)))
    }

    /// Register the sites listed in `config`. Invalid or duplicate entries
    /// are logged and skipped. Returns how many were added.
    pub async fn register_configured_sites(&mut self, config: &Config) -> usize {
        let mut added = 0;
        for site in &config.sites {
            let result = match site.cadence() {
                Ok(cadence) => self.add_site(site.name.clone(), site.url.clone(), cadence).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(_) => added += 1,
                Err(e) => {
                    warn!(
                        site = %site.name,
                        url = %site.url,
                        error = %e,
                        "Skipping configured site"
                    )
                }
            }
        }
        added
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.notifier.subscribe()
    }

    /// Start monitoring a site.
    ///
    /// When it is the only registered site it is checked right away, before
    /// this returns, in addition to its regular cadence.
    pub async fn add_site(
        &mut self,
        name: impl Into<String>,
        url: impl Into<String>,
        cadence: impl Into<Cadence>,
    ) -> Result<Site> {
        let (name, url, cadence) = (name.into(), url.into(), cadence.into());
        validate_site(&name, &url)?;

        let (site, first) = {
            let mut registry = self.registry.write().await;
            let site = registry.add(name, url, cadence)?;
            (site, registry.len() == 1)
        };

        if let Err(e) = self.scheduler.start(&site) {
            // Keep registry and timers in step
            let _ = self.registry.write().await.remove(site.url());
            return Err(e);
        }

        info!(site = site.name(), url = site.url(), cadence = %site.cadence(), "Site added");
        self.notifier.request_refresh();

        if first {
            self.context.run_check(site.url()).await;
        }

        Ok(self.site(site.url()).await.unwrap_or(site))
    }

    /// Stop a site's timer and forget the site
    pub async fn remove_site(&mut self, url: &str) -> Result<Site> {
        if !self.registry.read().await.contains(url) {
            return Err(MonitorError::NotFound(url.to_string()));
        }

        self.scheduler.stop(url);
        let site = self.registry.write().await.remove(url)?;

        info!(site = site.name(), url = site.url(), "Site removed");
        self.notifier.request_refresh();
        Ok(site)
    }

    /// Stopping a site removes it; there is no paused state
    pub async fn stop_monitoring(&mut self, url: &str) -> Result<Site> {
        self.remove_site(url).await
    }

    /// Check a site immediately, outside its cadence
    pub async fn check_now(&self, url: &str) -> Result<CheckOutcome> {
        if !self.registry.read().await.contains(url) {
            return Err(MonitorError::NotFound(url.to_string()));
        }

        self.context
            .run_check(url)
            .await
            .ok_or_else(|| MonitorError::NotFound(url.to_string()))
    }

    /// Snapshot of all sites in insertion order
    pub async fn sites(&self) -> Vec<Site> {
        self.registry.read().await.list().to_vec()
    }

    pub async fn site(&self, url: &str) -> Option<Site> {
        self.registry.read().await.get(url).cloned()
    }

    pub async fn len(&self) -> usize {
        self.registry.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.registry.read().await.is_empty()
    }

    /// Number of running timers; equals [`SiteMonitor::len`]
    pub fn active_schedules(&self) -> usize {
        self.scheduler.active_count()
    }

    pub fn is_scheduled(&self, url: &str) -> bool {
        self.scheduler.is_scheduled(url)
    }

    /// Cancel every timer and forget every site
    pub async fn shutdown(&mut self) {
        info!("Shutting down site monitor");
        self.scheduler.shutdown().await;

        let cleared = self.registry.write().await.clear();
        if cleared > 0 {
            self.notifier.request_refresh();
        }
    }
}
