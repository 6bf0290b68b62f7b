use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

use crate::modules::monitor::model::{MonitorId, NotificationTarget};
use crate::modules::monitor::store::StoreError;

/// Status tag carried by a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTag {
    Up,
    Down,
}

impl StatusTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
        }
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Webhook flavours with a dedicated payload shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Discord,
    Slack,
    Teams,
    Generic,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discord => "discord",
            Self::Slack => "slack",
            Self::Teams => "teams",
            Self::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadBody {
    /// Sent with `Content-Type: application/json`
    Json(serde_json::Value),
    /// Sent as-is, without a `Content-Type` header
    Text(String),
}

/// Provider-specific request body plus any extra headers
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPayload {
    pub provider: Provider,
    pub body: PayloadBody,
    pub headers: Vec<(&'static str, String)>,
}

/// A notification waiting for the delivery worker
#[derive(Debug, Clone)]
pub struct NotificationIntent {
    pub id: Uuid,
    pub monitor_id: MonitorId,
    pub monitor_name: String,
    pub status: StatusTag,
    pub target: NotificationTarget,
    pub payload: RenderedPayload,
    pub created_at: DateTime<Utc>,
}

/// What `NotificationDispatcher::notify` did with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Queued(Uuid),
    NoTarget,
    InvalidTarget,
    Dropped,
}

/// Webhook delivery status
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryStatus {
    Success,
    Failure,
    Timeout,
    Rejected,
    RateLimited,
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Invalid webhook URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Webhook URL has no host: {0}")]
    MissingHost(String),
    #[error("Settings unavailable: {0}")]
    Settings(#[from] StoreError),
}
