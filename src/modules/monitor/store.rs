use async_trait::async_trait;

use crate::modules::monitor::model::{
    Heartbeat, Monitor, MonitorId, NotificationTarget, ProbeRecord, Verdict,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Invalid row: {0}")]
    InvalidRow(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence gateway consumed by the monitoring engine
#[async_trait]
pub trait MonitorStore: Send + Sync {
    async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError>;

    /// Fallback webhook target from the settings singleton
    async fn default_notification_target(&self) -> Result<Option<NotificationTarget>, StoreError>;

    /// Writes confirmed status, latency and failure counter, stamping `last_checked`
    async fn record_probe_result(&self, record: &ProbeRecord) -> Result<(), StoreError>;

    async fn append_heartbeat(
        &self,
        monitor_id: MonitorId,
        verdict: Verdict,
        latency_ms: u32,
    ) -> Result<(), StoreError>;

    /// Newest first
    async fn recent_heartbeats(
        &self,
        monitor_id: MonitorId,
        limit: u32,
    ) -> Result<Vec<Heartbeat>, StoreError>;
}
