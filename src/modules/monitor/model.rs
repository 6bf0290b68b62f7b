use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type MonitorId = i64;

/// Confirmed, hysteresis-filtered status of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Pending,
    Up,
    Down,
}

impl MonitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(format!("unknown monitor status '{}'", other)),
        }
    }
}

/// Raw result of a single probe, before any flapping protection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Up,
    Down,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(format!("unknown verdict '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Http,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
        }
    }
}

impl FromStr for ProbeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            other => Err(format!("unsupported probe kind '{}'", other)),
        }
    }
}

/// A probe target together with its observed state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    pub id: MonitorId,
    pub name: String,
    pub url: String,
    pub kind: ProbeKind,
    pub interval_secs: u32,
    pub failure_threshold: u32,
    pub status: MonitorStatus,
    pub response_time_ms: Option<u32>,
    pub last_checked: Option<DateTime<Utc>>,
    pub consecutive_fails: u32,
    pub notification_url: Option<String>,
    #[serde(skip_serializing)]
    pub notification_token: Option<String>,
}

impl Monitor {
    /// Next instant this monitor should be probed, `None` when never checked
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.last_checked
            .map(|checked| checked + Duration::seconds(i64::from(self.interval_secs)))
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.next_due() {
            None => true,
            Some(next) => now >= next,
        }
    }

    /// Per-monitor webhook target, ignoring blank form values
    pub fn own_notification_target(&self) -> Option<NotificationTarget> {
        NotificationTarget::from_parts(
            self.notification_url.as_deref(),
            self.notification_token.as_deref(),
        )
    }
}

/// One immutable probe record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub id: i64,
    pub monitor_id: MonitorId,
    pub status: Verdict,
    pub latency_ms: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTarget {
    pub url: String,
    pub token: Option<String>,
}

impl NotificationTarget {
    pub fn from_parts(url: Option<&str>, token: Option<&str>) -> Option<Self> {
        let url = url.map(str::trim).filter(|u| !u.is_empty())?;
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Some(Self {
            url: url.to_string(),
            token,
        })
    }
}

/// Snapshot of the global settings row, taken once per dispatch
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub default_target: Option<NotificationTarget>,
}

/// State written back to a monitor row after each probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRecord {
    pub monitor_id: MonitorId,
    pub status: MonitorStatus,
    pub response_time_ms: u32,
    pub consecutive_fails: u32,
}
