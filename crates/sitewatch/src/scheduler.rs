use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::checker::Checker;
use crate::error::{MonitorError, Result};
use crate::notifier::Notifier;
use crate::registry::SharedRegistry;
use crate::types::{CheckOutcome, Site};

/// Everything a single check needs: where to read and write site state,
/// how to probe, and whom to tell.
#[derive(Clone)]
pub(crate) struct CheckContext {
    registry: SharedRegistry,
    checker: Arc<dyn Checker>,
    notifier: Notifier,
}

impl CheckContext {
    pub(crate) fn new(
        registry: SharedRegistry,
        checker: Arc<dyn Checker>,
        notifier: Notifier,
    ) -> Self {
        Self { registry, checker, notifier }
    }

    /// Check one site, record the outcome and notify observers.
    ///
    /// Returns `None` without probing when no site is registered or `url`
    /// is unknown, and discards the outcome when the site was removed while
    /// the probe was in flight.
    pub(crate) async fn run_check(&self, url: &str) -> Option<CheckOutcome> {
        let site_name = {
            let registry = self.registry.read().await;
            if registry.is_empty() {
                debug!(url, "No sites registered, skipping check");
                return None;
            }
            match registry.get(url) {
                Some(site) => site.name().to_string(),
                None => {
                    debug!(url, "Site no longer registered, skipping check");
                    return None;
                }
            }
        };

        debug!(site = %site_name, url, "Checking site status");
        let outcome = self.checker.check(url).await;

        let Some(site) = self.registry.write().await.apply(url, &outcome) else {
            debug!(url, "Site removed while its check was in flight, discarding result");
            return None;
        };

        self.notify(&site, &outcome);
        Some(outcome)
    }

    fn notify(&self, site: &Site, outcome: &CheckOutcome) {
        match outcome {
            CheckOutcome::Offline { reason } if reason.is_failure() => {
                self.notifier.notify_error(site, &reason.to_string());
            }
            CheckOutcome::Online { .. } | CheckOutcome::Offline { .. } => {
                self.notifier.notify_status(site);
            }
        }
        self.notifier.request_refresh();
    }
}

/// A running timer task and the means to stop it
struct ScheduledCheck {
    handle: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
}

/// Owns one recurring timer per monitored site, keyed by URL.
///
/// Dropping the scheduler drops every shutdown sender, which ends all timer
/// tasks at their next suspension point.
pub struct MonitoringScheduler {
    context: CheckContext,
    scheduled: HashMap<String, ScheduledCheck>,
}

impl MonitoringScheduler {
    pub(crate) fn new(context: CheckContext) -> Self {
        Self { context, scheduled: HashMap::new() }
    }

    /// Start the recurring timer for `site`.
    ///
    /// The first tick fires one full period after this call.
    pub fn start(&mut self, site: &Site) -> Result<()> {
        if self.scheduled.contains_key(site.url()) {
            return Err(MonitorError::AlreadyScheduled(site.url().to_string()));
        }

        let period = site.cadence().period();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run_schedule(
            self.context.clone(),
            site.url().to_string(),
            period,
            shutdown_rx,
        ));

        info!(
            site = site.name(),
            url = site.url(),
            period_ms = period.as_millis() as u64,
            "Scheduled site checks"
        );
        self.scheduled.insert(site.url().to_string(), ScheduledCheck { handle, shutdown_tx });
        Ok(())
    }

    /// Cancel the timer for `url`. Returns `false` if none was running.
    pub fn stop(&mut self, url: &str) -> bool {
        let Some(scheduled) = self.scheduled.remove(url) else {
            debug!(url, "No schedule to stop");
            return false;
        };

        if scheduled.shutdown_tx.send(()).is_err() {
            warn!(url, "Schedule task already finished before shutdown");
        }
        info!(url, "Stopped site checks");
        true
    }

    /// Cancel every timer and wait for the tasks to exit
    pub async fn shutdown(&mut self) {
        let count = self.scheduled.len();
        let handles: Vec<JoinHandle<()>> = self
            .scheduled
            .drain()
            .map(|(_, scheduled)| {
                let _ = scheduled.shutdown_tx.send(());
                scheduled.handle
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Schedule task ended abnormally");
                }
            }
        }
        info!(count, "All site schedules stopped");
    }

    pub fn is_scheduled(&self, url: &str) -> bool {
        self.scheduled.contains_key(url)
    }

    /// Number of live timers
    pub fn active_count(&self) -> usize {
        self.scheduled.len()
    }
}

/// Timer loop of a single site. Ticks never overlap: the next tick is only
/// taken once the current check is done.
async fn run_schedule(
    context: CheckContext,
    url: String,
    period: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            _ = timer.tick() => {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    _ = context.run_check(&url) => {}
                }
            }
        }
    }
    debug!(url = %url, "Schedule task exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SiteRegistry;
    use crate::types::{Cadence, IntervalUnit, SiteStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Always online, counts invocations, optionally slow
    #[derive(Default)]
    struct CountingChecker {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingChecker {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Checker for CountingChecker {
        async fn check(&self, _url: &str) -> CheckOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            CheckOutcome::online(1)
        }
    }

    fn setup(checker: Arc<CountingChecker>) -> (SharedRegistry, MonitoringScheduler) {
        let registry = SiteRegistry::new().shared();
        let context = CheckContext::new(registry.clone(), checker, Notifier::default());
        (registry, MonitoringScheduler::new(context))
    }

    fn detached_site(url: &str, unit: IntervalUnit) -> Site {
        Site::new("Detached".into(), url.into(), unit.into())
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_cadence() {
        let checker = Arc::new(CountingChecker::default());
        let (registry, mut scheduler) = setup(checker.clone());

        let site = registry
            .write()
            .await
            .add("Fast", "https://fast.example", IntervalUnit::Seconds.into())
            .unwrap();
        scheduler.start(&site).unwrap();

        // Nothing before the first full period
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(checker.calls(), 0);

        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(checker.calls(), 3);
        assert_eq!(
            registry.read().await.get("https://fast.example").unwrap().status(),
            SiteStatus::Online
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_minutes_cadence() {
        let checker = Arc::new(CountingChecker::default());
        let (registry, mut scheduler) = setup(checker.clone());

        let site = registry
            .write()
            .await
            .add("Slow", "https://slow.example", Cadence::default())
            .unwrap();
        scheduler.start(&site).unwrap();

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(checker.calls(), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(checker.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_rejected() {
        let checker = Arc::new(CountingChecker::default());
        let (_registry, mut scheduler) = setup(checker);
        let site = detached_site("https://dup.example", IntervalUnit::Seconds);

        scheduler.start(&site).unwrap();
        let err = scheduler.start(&site).unwrap_err();
        assert!(matches!(err, MonitorError::AlreadyScheduled(_)));
        assert_eq!(scheduler.active_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let checker = Arc::new(CountingChecker::default());
        let (_registry, mut scheduler) = setup(checker);
        let site = detached_site("https://stop.example", IntervalUnit::Seconds);

        assert!(!scheduler.stop(site.url()));
        scheduler.start(&site).unwrap();
        assert!(scheduler.is_scheduled(site.url()));
        assert!(scheduler.stop(site.url()));
        assert!(!scheduler.stop(site.url()));
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_checks_after_stop() {
        let checker = Arc::new(CountingChecker::default());
        let (registry, mut scheduler) = setup(checker.clone());

        let site = registry
            .write()
            .await
            .add("Fast", "https://fast.example", IntervalUnit::Seconds.into())
            .unwrap();
        scheduler.start(&site).unwrap();

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        let before = checker.calls();
        assert_eq!(before, 2);

        scheduler.stop(site.url());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(checker.calls(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_with_empty_registry_does_not_check() {
        let checker = Arc::new(CountingChecker::default());
        let (registry, mut scheduler) = setup(checker.clone());

        // A timer outliving its site: registry is empty when it fires
        scheduler.start(&detached_site("https://stale.example", IntervalUnit::Seconds)).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(registry.read().await.is_empty());
        assert_eq!(checker.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_result_for_removed_site_is_discarded() {
        let checker =
            Arc::new(CountingChecker { delay: Duration::from_secs(2), ..Default::default() });
        let registry = SiteRegistry::new().shared();
        let notifier = Notifier::default();
        let mut events = notifier.subscribe();
        let context = CheckContext::new(registry.clone(), checker.clone(), notifier);

        registry
            .write()
            .await
            .add("Gone", "https://gone.example", Cadence::default())
            .unwrap();
        registry
            .write()
            .await
            .add("Kept", "https://kept.example", Cadence::default())
            .unwrap();

        let in_flight = {
            let context = context.clone();
            tokio::spawn(async move { context.run_check("https://gone.example").await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(checker.calls(), 1);
        registry.write().await.remove("https://gone.example").unwrap();

        assert!(in_flight.await.unwrap().is_none());
        assert!(events.try_recv().is_err());
        assert!(!registry.read().await.contains("https://gone.example"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_everything() {
        let checker = Arc::new(CountingChecker::default());
        let (registry, mut scheduler) = setup(checker.clone());

        for url in ["https://a.example", "https://b.example"] {
            let site = registry
                .write()
                .await
                .add(url, url, IntervalUnit::Seconds.into())
                .unwrap();
            scheduler.start(&site).unwrap();
        }

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(checker.calls(), 2);

        scheduler.shutdown().await;
        assert_eq!(scheduler.active_count(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(checker.calls(), 2);
    }
}
