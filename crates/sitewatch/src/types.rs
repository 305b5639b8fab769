use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Reachability status of a monitored site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    #[default]
    Unknown,
    Online,
    Offline,
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteStatus::Unknown => write!(f, "unknown"),
            SiteStatus::Online => write!(f, "online"),
            SiteStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Unit a site's polling cadence is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    #[default]
    Minutes,
    Seconds,
}

impl IntervalUnit {
    /// Period of a single unit: one minute or one second
    pub const fn base_period(self) -> Duration {
        match self {
            IntervalUnit::Minutes => Duration::from_secs(60),
            IntervalUnit::Seconds => Duration::from_secs(1),
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalUnit::Minutes => write!(f, "minutes"),
            IntervalUnit::Seconds => write!(f, "seconds"),
        }
    }
}

impl FromStr for IntervalUnit {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "min" | "mins" | "minute" | "minutes" => Ok(IntervalUnit::Minutes),
            "s" | "sec" | "secs" | "second" | "seconds" => Ok(IntervalUnit::Seconds),
            _ => Err(MonitorError::InvalidInterval(s.to_string())),
        }
    }
}

/// How often a site is checked: `every` repetitions of `unit`.
///
/// A cadence built from a bare unit fires once per minute or once per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cadence {
    unit: IntervalUnit,
    every: u32,
}

impl Cadence {
    pub fn new(unit: IntervalUnit, every: u32) -> Result<Self> {
        if every == 0 {
            return Err(MonitorError::InvalidInterval(format!("0 {unit}")));
        }
        Ok(Self { unit, every })
    }

    pub fn unit(&self) -> IntervalUnit {
        self.unit
    }

    pub fn every(&self) -> u32 {
        self.every
    }

    /// Time between two ticks
    pub fn period(&self) -> Duration {
        self.unit.base_period() * self.every
    }
}

impl From<IntervalUnit> for Cadence {
    fn from(unit: IntervalUnit) -> Self {
        Self { unit, every: 1 }
    }
}

impl Default for Cadence {
    fn default() -> Self {
        IntervalUnit::default().into()
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.every == 1 {
            write!(f, "{}", self.unit)
        } else {
            write!(f, "{} {}", self.every, self.unit)
        }
    }
}

/// Accepts `minutes`, `seconds`, `30s`, `5m` or `2 minutes`
impl FromStr for Cadence {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let split = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
        let (count, unit) = text.split_at(split);

        let unit: IntervalUnit =
            unit.parse().map_err(|_| MonitorError::InvalidInterval(s.to_string()))?;
        let every = if count.is_empty() {
            1
        } else {
            count.parse().map_err(|_| MonitorError::InvalidInterval(s.to_string()))?
        };

        Cadence::new(unit, every)
    }
}

/// Why a check classified a site as offline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfflineReason {
    /// The site answered with something other than 200
    Status(u16),
    /// DNS, connect, TLS or timeout failure
    Network(String),
}

impl fmt::Display for OfflineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfflineReason::Status(code) => write!(f, "HTTP status {code}"),
            OfflineReason::Network(message) => write!(f, "{message}"),
        }
    }
}

impl OfflineReason {
    /// A failed request rather than a reply that merely wasn't 200.
    ///
    /// Transport failures and statuses outside 2xx count; a 204 does not.
    pub fn is_failure(&self) -> bool {
        match self {
            OfflineReason::Status(code) => !(200..300).contains(code),
            OfflineReason::Network(_) => true,
        }
    }
}

/// Classification of a single health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Online { latency_ms: u64 },
    Offline { reason: OfflineReason },
}

impl CheckOutcome {
    pub fn online(latency_ms: u64) -> Self {
        CheckOutcome::Online { latency_ms }
    }

    pub fn offline(reason: OfflineReason) -> Self {
        CheckOutcome::Offline { reason }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, CheckOutcome::Online { .. })
    }

    /// Status a site takes on after this outcome
    pub fn status(&self) -> SiteStatus {
        if self.is_online() { SiteStatus::Online } else { SiteStatus::Offline }
    }
}

/// A monitored site.
///
/// Only completed checks change `status` and the observation fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Site {
    name: String,
    url: String,
    status: SiteStatus,
    cadence: Cadence,
    last_checked: Option<DateTime<Utc>>,
    latency_ms: Option<u64>,
    last_error: Option<String>,
}

impl Site {
    pub(crate) fn new(name: String, url: String, cadence: Cadence) -> Self {
        Self {
            name,
            url,
            status: SiteStatus::Unknown,
            cadence,
            last_checked: None,
            latency_ms: None,
            last_error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> SiteStatus {
        self.status
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// When the last completed check finished
    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.last_checked
    }

    /// Response time of the last check, if it came back online
    pub fn latency_ms(&self) -> Option<u64> {
        self.latency_ms
    }

    /// Reason of the last check, if it came back offline
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn apply(&mut self, outcome: &CheckOutcome) {
        self.status = outcome.status();
        self.last_checked = Some(Utc::now());
        match outcome {
            CheckOutcome::Online { latency_ms } => {
                self.latency_ms = Some(*latency_ms);
                self.last_error = None;
            }
            CheckOutcome::Offline { reason } => {
                self.latency_ms = None;
                self.last_error = Some(reason.to_string());
            }
        }
    }
}
