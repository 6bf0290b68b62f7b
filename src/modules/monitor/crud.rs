use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, Pool};

use crate::modules::monitor::model::{
    Heartbeat, Monitor, MonitorId, NotificationTarget, ProbeRecord, Verdict,
};
use crate::modules::monitor::store::{MonitorStore, StoreError};

#[derive(Debug, sqlx::FromRow)]
struct MonitorRow {
    id: i64,
    name: String,
    kind: String,
    url: String,
    interval_secs: i32,
    failure_threshold: i32,
    status: String,
    response_time_ms: Option<i32>,
    last_checked: Option<DateTime<Utc>>,
    consecutive_fails: i32,
    notification_url: Option<String>,
    notification_token: Option<String>,
}

impl TryFrom<MonitorRow> for Monitor {
    type Error = StoreError;

    fn try_from(row: MonitorRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let invalid = |field: &str, reason: String| {
            StoreError::InvalidRow(format!("monitor {} {}: {}", id, field, reason))
        };

        Ok(Monitor {
            id: row.id,
            kind: row.kind.parse().map_err(|e| invalid("kind", e))?,
            status: row.status.parse().map_err(|e| invalid("status", e))?,
            interval_secs: u32::try_from(row.interval_secs)
                .map_err(|e| invalid("interval_secs", e.to_string()))?,
            failure_threshold: u32::try_from(row.failure_threshold)
                .map_err(|e| invalid("failure_threshold", e.to_string()))?,
            consecutive_fails: u32::try_from(row.consecutive_fails)
                .map_err(|e| invalid("consecutive_fails", e.to_string()))?,
            response_time_ms: row.response_time_ms.and_then(|v| u32::try_from(v).ok()),
            last_checked: row.last_checked,
            name: row.name,
            url: row.url,
            notification_url: row.notification_url,
            notification_token: row.notification_token,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HeartbeatRow {
    id: i64,
    monitor_id: i64,
    status: String,
    latency_ms: i32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct SettingsRow {
    notification_url: Option<String>,
    notification_token: Option<String>,
}

/// MySQL-backed persistence gateway
pub struct MonitorCrud {
    pool: Pool<MySql>,
    retention_days: u32,
}

impl MonitorCrud {
    pub fn new(pool: Pool<MySql>, retention_days: u32) -> Self {
        Self { pool, retention_days }
    }
}

#[async_trait]
impl MonitorStore for MonitorCrud {
    async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError> {
        let rows = sqlx::query_as::<_, MonitorRow>(
            r#"
            SELECT id, name, kind, url, interval_secs, failure_threshold, status,
                   response_time_ms, last_checked, consecutive_fails,
                   notification_url, notification_token
            FROM monitors
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        // Unreadable rows are skipped, the rest still get probed
        let mut monitors = Vec::with_capacity(rows.len());
        for row in rows {
            match Monitor::try_from(row) {
                Ok(monitor) => monitors.push(monitor),
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable monitor row"),
            }
        }

        Ok(monitors)
    }

    async fn default_notification_target(&self) -> Result<Option<NotificationTarget>, StoreError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT notification_url, notification_token FROM settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|r| {
            NotificationTarget::from_parts(
                r.notification_url.as_deref(),
                r.notification_token.as_deref(),
            )
        }))
    }

    async fn record_probe_result(&self, record: &ProbeRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE monitors
            SET status = ?,
                response_time_ms = ?,
                consecutive_fails = ?,
                last_checked = UTC_TIMESTAMP()
            WHERE id = ?
            "#,
        )
        .bind(record.status.as_str())
        .bind(record.response_time_ms)
        .bind(record.consecutive_fails)
        .bind(record.monitor_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(monitor_id = record.monitor_id, "Monitor vanished before its result was recorded");
        }

        Ok(())
    }

    async fn append_heartbeat(
        &self,
        monitor_id: MonitorId,
        verdict: Verdict,
        latency_ms: u32,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO heartbeats (monitor_id, status, latency_ms, created_at)
            VALUES (?, ?, ?, UTC_TIMESTAMP())
            "#,
        )
        .bind(monitor_id)
        .bind(verdict.as_str())
        .bind(latency_ms)
        .execute(&mut *tx)
        .await?;

        // MySQL triggers cannot prune the table they fire on, so retention runs here
        sqlx::query(
            "DELETE FROM heartbeats WHERE created_at < UTC_TIMESTAMP() - INTERVAL ? DAY",
        )
        .bind(self.retention_days)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn recent_heartbeats(
        &self,
        monitor_id: MonitorId,
        limit: u32,
    ) -> Result<Vec<Heartbeat>, StoreError> {
        let rows = sqlx::query_as::<_, HeartbeatRow>(
            r#"
            SELECT id, monitor_id, status, latency_ms, created_at
            FROM heartbeats
            WHERE monitor_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(monitor_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Heartbeat {
                    id: row.id,
                    monitor_id: row.monitor_id,
                    status: row
                        .status
                        .parse()
                        .map_err(|e| StoreError::InvalidRow(format!("heartbeat {}: {}", row.id, e)))?,
                    latency_ms: u32::try_from(row.latency_ms).unwrap_or(0),
                    created_at: row.created_at,
                })
            })
            .collect()
    }
}
