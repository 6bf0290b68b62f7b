use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::modules::monitor::model::{MonitorId, MonitorStatus, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalStatus {
    Operational,
    Degraded,
    Outage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatPoint {
    pub status: Verdict,
    pub latency_ms: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSummary {
    pub id: MonitorId,
    pub name: String,
    pub url: String,
    pub status: MonitorStatus,
    pub response_time_ms: Option<u32>,
    pub last_checked: Option<DateTime<Utc>>,
    pub uptime_percent: u32,
    /// Oldest first
    pub history: Vec<HeartbeatPoint>,
}

/// Response body of `GET /api/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSummary {
    pub status: GlobalStatus,
    pub active: usize,
    pub online: usize,
    pub avg_latency_ms: u32,
    pub monitors: Vec<MonitorSummary>,
}
