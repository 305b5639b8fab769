use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::types::{Site, SiteStatus};

/// Events delivered to observers of the monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// The site set or a site's displayed state changed
    SiteListChanged,
    StatusMessage { site_name: String, online: bool, message: String },
    ErrorMessage { site_name: String, reason: String, message: String },
}

impl MonitorEvent {
    /// Human-readable text, if the event carries any
    pub fn message(&self) -> Option<&str> {
        match self {
            MonitorEvent::SiteListChanged => None,
            MonitorEvent::StatusMessage { message, .. }
            | MonitorEvent::ErrorMessage { message, .. } => Some(message.as_str()),
        }
    }
}

/// Fans monitor events out to every registered observer.
///
/// Publishing never blocks and never fails; events sent while nobody is
/// subscribed are dropped.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<MonitorEvent>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl Notifier {
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }

    /// Register a callback invoked for every event.
    ///
    /// The callback runs on its own task until the notifier and all its
    /// clones are dropped, or the returned handle is aborted.
    pub fn on_event<F>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(MonitorEvent) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => callback(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event observer lagged behind, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Announce whether `site` is online or offline
    pub fn notify_status(&self, site: &Site) {
        let online = site.status() == SiteStatus::Online;
        let state = if online { "online" } else { "offline" };
        let message = format!("Site {} is {}.", site.name(), state);

        if online {
            info!(site = site.name(), url = site.url(), "{}", message);
        } else {
            warn!(site = site.name(), url = site.url(), "{}", message);
        }

        self.publish(MonitorEvent::StatusMessage {
            site_name: site.name().to_string(),
            online,
            message,
        });
    }

    /// Announce that checking `site` failed
    pub fn notify_error(&self, site: &Site, reason: &str) {
        let message = format!("Error checking site {}: {}", site.name(), reason);
        error!(site = site.name(), url = site.url(), "{}", message);

        self.publish(MonitorEvent::ErrorMessage {
            site_name: site.name().to_string(),
            reason: reason.to_string(),
            message,
        });
    }

    /// Tell observers to redraw
    pub fn request_refresh(&self) {
        debug!("Requesting refresh");
        self.publish(MonitorEvent::SiteListChanged);
    }

    fn publish(&self, event: MonitorEvent) {
        // No receivers is fine
        let _ = self.tx.send(event);
    }
}
