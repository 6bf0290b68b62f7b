use crate::modules::monitor::model::{Heartbeat, Monitor, MonitorStatus, Verdict};
use crate::modules::monitor::schema::{GlobalStatus, HeartbeatPoint, MonitorSummary, StatusSummary};
use crate::modules::monitor::store::{MonitorStore, StoreError};

/// Heartbeats considered per monitor
pub const HISTORY_WINDOW: u32 = 50;

/// Below this share of online monitors the page reports an outage
pub const OUTAGE_RATIO: f64 = 0.8;

/// Rounded share of `Up` heartbeats, 0 for an empty history
pub fn uptime_percent(history: &[Heartbeat]) -> u32 {
    let up = history.iter().filter(|h| h.status == Verdict::Up).count();
    let total = history.len().max(1);

    ((up as f64 / total as f64) * 100.0).round() as u32
}

/// Build the public status view. Histories come in newest first.
pub fn summarize(entries: Vec<(Monitor, Vec<Heartbeat>)>) -> StatusSummary {
    let active = entries.len();
    let online = entries
        .iter()
        .filter(|(m, _)| m.status == MonitorStatus::Up)
        .count();
    let any_down = entries.iter().any(|(m, _)| m.status == MonitorStatus::Down);

    let total_latency: u64 = entries
        .iter()
        .map(|(m, _)| u64::from(m.response_time_ms.unwrap_or(0)))
        .sum();
    let avg_latency_ms = if active > 0 {
        (total_latency as f64 / active as f64).round() as u32
    } else {
        0
    };

    let status = if active > 0 && (online as f64 / active as f64) < OUTAGE_RATIO {
        GlobalStatus::Outage
    } else if any_down {
        GlobalStatus::Degraded
    } else {
        GlobalStatus::Operational
    };

    let monitors = entries
        .into_iter()
        .map(|(monitor, history)| {
            let uptime_percent = uptime_percent(&history);
            let history = history
                .into_iter()
                .rev()
                .map(|h| HeartbeatPoint {
                    status: h.status,
                    latency_ms: h.latency_ms,
                    timestamp: h.created_at,
                })
                .collect();

            MonitorSummary {
                id: monitor.id,
                name: monitor.name,
                url: monitor.url,
                status: monitor.status,
                response_time_ms: monitor.response_time_ms,
                last_checked: monitor.last_checked,
                uptime_percent,
                history,
            }
        })
        .collect();

    StatusSummary {
        status,
        active,
        online,
        avg_latency_ms,
        monitors,
    }
}

pub async fn load_summary(store: &dyn MonitorStore) -> Result<StatusSummary, StoreError> {
    let monitors = store.list_monitors().await?;

    let mut entries = Vec::with_capacity(monitors.len());
    for monitor in monitors {
        let history = store.recent_heartbeats(monitor.id, HISTORY_WINDOW).await?;
        entries.push((monitor, history));
    }

    Ok(summarize(entries))
}
