//! Shared helpers for sitewatch integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitewatch::{CheckOutcome, Checker, MonitorEvent, Notifier, SiteMonitor};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// In-memory checker answering from a script. Unscripted URLs are online.
#[derive(Default)]
pub struct ScriptedChecker {
    outcomes: Mutex<HashMap<String, CheckOutcome>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Mutex<Duration>,
}

impl ScriptedChecker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, outcome: CheckOutcome) {
        self.outcomes.lock().unwrap().insert(url.to_string(), outcome);
    }

    /// Make every later check take `delay` before answering
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl Checker for ScriptedChecker {
    async fn check(&self, url: &str) -> CheckOutcome {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.outcomes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(CheckOutcome::online(5))
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Monitor wired to `checker`, plus a subscription opened before any request
pub fn monitor_with(
    checker: Arc<ScriptedChecker>,
) -> (SiteMonitor, broadcast::Receiver<MonitorEvent>) {
    init_tracing();
    let monitor = SiteMonitor::new(checker, Notifier::new(1024));
    let events = monitor.subscribe();
    (monitor, events)
}

/// Local HTTP server answering every request with `status` and an empty
/// body. Returns the base URL.
pub async fn serve_status(status: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let response =
                    format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    format!("http://{addr}/")
}

/// Everything published so far
pub fn drain(events: &mut broadcast::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

pub fn status_messages(events: &[MonitorEvent]) -> Vec<(String, bool)> {
    events
        .iter()
        .filter_map(|event| match event {
            MonitorEvent::StatusMessage { site_name, online, .. } => {
                Some((site_name.clone(), *online))
            }
            _ => None,
        })
        .collect()
}

pub fn error_messages(events: &[MonitorEvent]) -> Vec<(String, String)> {
    events
        .iter()
        .filter_map(|event| match event {
            MonitorEvent::ErrorMessage { site_name, reason, .. } => {
                Some((site_name.clone(), reason.clone()))
            }
            _ => None,
        })
        .collect()
}

pub fn refreshes(events: &[MonitorEvent]) -> usize {
    events.iter().filter(|event| **event == MonitorEvent::SiteListChanged).count()
}
