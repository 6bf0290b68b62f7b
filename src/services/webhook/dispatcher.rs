use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::modules::monitor::model::{Monitor, NotificationTarget, Settings};
use crate::modules::monitor::store::MonitorStore;
use crate::services::metrics::MonitorMetrics;
use crate::services::webhook::{
    render_for_url, DeliveryResult, DispatchOutcome, NotificationIntent, RenderContext,
    RetryConfig, StatusTag, WebhookDeliveryClient, WebhookError,
};

/// Human-readable notification text
pub fn status_message(monitor: &Monitor, status: StatusTag) -> String {
    format!("Monitor {} is now {} ({})", monitor.name, status, monitor.url)
}

/// Per-monitor target wins, the settings default is the fallback
pub fn resolve_target(monitor: &Monitor, settings: &Settings) -> Option<NotificationTarget> {
    monitor
        .own_notification_target()
        .or_else(|| settings.default_target.clone())
}

/// Resolves targets, renders payloads and hands intents to the delivery worker
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn MonitorStore>,
    queue: mpsc::Sender<NotificationIntent>,
    metrics: Arc<MonitorMetrics>,
}

impl NotificationDispatcher {
    pub fn channel(
        store: Arc<dyn MonitorStore>,
        metrics: Arc<MonitorMetrics>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<NotificationIntent>) {
        let (queue, receiver) = mpsc::channel(capacity.max(1));
        (Self { store, queue, metrics }, receiver)
    }

    /// Settings snapshot, only read when the monitor has no target of its own
    async fn settings_for(&self, monitor: &Monitor) -> Result<Settings, WebhookError> {
        if monitor.own_notification_target().is_some() {
            return Ok(Settings::default());
        }

        let default_target = self.store.default_notification_target().await?;
        Ok(Settings { default_target })
    }

    /// Enqueue a notification without waiting for delivery
    pub async fn notify(&self, monitor: &Monitor, message: &str, status: StatusTag) -> DispatchOutcome {
        let settings = match self.settings_for(monitor).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(monitor_id = monitor.id, error = %e, "Could not read notification settings");
                Settings::default()
            }
        };

        let Some(target) = resolve_target(monitor, &settings) else {
            tracing::debug!(monitor_id = monitor.id, "No notification target configured");
            self.record("none", "no_target");
            return DispatchOutcome::NoTarget;
        };

        let ctx = RenderContext {
            monitor_name: &monitor.name,
            message,
            status,
        };

        let payload = match render_for_url(&target.url, &ctx) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(monitor_id = monitor.id, error = %e, "Skipping notification");
                self.record("none", "invalid_target");
                return DispatchOutcome::InvalidTarget;
            }
        };

        let provider = payload.provider;
        let intent = NotificationIntent {
            id: Uuid::new_v4(),
            monitor_id: monitor.id,
            monitor_name: monitor.name.clone(),
            status,
            target,
            payload,
            created_at: Utc::now(),
        };
        let intent_id = intent.id;

        match self.queue.try_send(intent) {
            Ok(()) => {
                tracing::debug!(
                    monitor_id = monitor.id,
                    %intent_id,
                    provider = provider.as_str(),
                    status = status.as_str(),
                    "Notification queued"
                );
                self.record(provider.as_str(), "queued");
                DispatchOutcome::Queued(intent_id)
            }
            Err(TrySendError::Full(_)) => {
                tracing::error!(monitor_id = monitor.id, %intent_id, "Notification queue full, dropping");
                self.record(provider.as_str(), "dropped");
                DispatchOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                tracing::error!(monitor_id = monitor.id, %intent_id, "Notification worker stopped, dropping");
                self.record(provider.as_str(), "dropped");
                DispatchOutcome::Dropped
            }
        }
    }

    fn record(&self, provider: &str, outcome: &str) {
        self.metrics
            .notifications_total
            .with_label_values(&[provider, outcome])
            .inc();
    }
}

/// Delivers queued intents; exits once every dispatcher is dropped and the queue is drained
pub struct NotificationWorker {
    queue: mpsc::Receiver<NotificationIntent>,
    client: Arc<WebhookDeliveryClient>,
    retry_config: RetryConfig,
    metrics: Arc<MonitorMetrics>,
}

impl NotificationWorker {
    pub fn new(
        queue: mpsc::Receiver<NotificationIntent>,
        client: WebhookDeliveryClient,
        retry_config: RetryConfig,
        metrics: Arc<MonitorMetrics>,
    ) -> Self {
        Self {
            queue,
            client: Arc::new(client),
            retry_config,
            metrics,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Notification worker started");
        let mut deliveries = JoinSet::new();

        while let Some(intent) = self.queue.recv().await {
            while deliveries.try_join_next().is_some() {}

            let client = Arc::clone(&self.client);
            let retry_config = self.retry_config.clone();
            let metrics = Arc::clone(&self.metrics);

            deliveries.spawn(async move {
                let result = deliver_with_retry(&client, &retry_config, &intent).await;
                let outcome = if result.is_success() { "delivered" } else { "failed" };
                metrics
                    .notifications_total
                    .with_label_values(&[intent.payload.provider.as_str(), outcome])
                    .inc();
            });
        }

        while let Some(joined) = deliveries.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Notification delivery task panicked");
            }
        }
        tracing::info!("Notification worker stopped");
    }
}

/// Best-effort delivery: retryable failures are retried with backoff, the final result is logged
pub async fn deliver_with_retry(
    client: &WebhookDeliveryClient,
    retry_config: &RetryConfig,
    intent: &NotificationIntent,
) -> DeliveryResult {
    let mut attempt: u32 = 0;

    loop {
        let result = client.deliver(&intent.target, &intent.payload).await;
        attempt += 1;

        if result.is_success() {
            tracing::info!(
                monitor_id = intent.monitor_id,
                intent_id = %intent.id,
                provider = intent.payload.provider.as_str(),
                attempt,
                "🔔 Notification sent for {}",
                intent.monitor_name
            );
            return result;
        }

        if !result.is_retryable() || !retry_config.should_retry(attempt) {
            tracing::warn!(
                monitor_id = intent.monitor_id,
                intent_id = %intent.id,
                provider = intent.payload.provider.as_str(),
                attempt,
                response_status = ?result.response_status,
                error = result.error_message.as_deref().unwrap_or("unknown"),
                "❌ Notification failed for {}",
                intent.monitor_name
            );
            return result;
        }

        let delay = retry_config.calculate_delay(attempt - 1);
        tracing::debug!(
            intent_id = %intent.id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Retrying notification"
        );
        tokio::time::sleep(delay).await;
    }
}
