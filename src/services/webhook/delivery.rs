use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};

use crate::modules::monitor::model::NotificationTarget;
use crate::services::webhook::{DeliveryStatus, PayloadBody, RenderedPayload, RetryConfig};

pub const DEFAULT_USER_AGENT: &str = "Pulsewatch-Webhooks/1.0";

/// Webhook delivery client
pub struct WebhookDeliveryClient {
    client: Client,
}

impl WebhookDeliveryClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    /// POST a rendered payload. Network failures come back as a failed result.
    pub async fn deliver(
        &self,
        target: &NotificationTarget,
        payload: &RenderedPayload,
    ) -> DeliveryResult {
        let start = Instant::now();

        let mut request = self.client.post(&target.url);

        request = match &payload.body {
            PayloadBody::Json(value) => request.json(value),
            PayloadBody::Text(text) => request.body(text.clone()),
        };

        for (name, value) in &payload.headers {
            request = request.header(*name, value.as_str());
        }

        if let Some(token) = &target.token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                let duration = start.elapsed();

                if e.is_timeout() {
                    return DeliveryResult {
                        status: DeliveryStatus::Timeout,
                        response_status: None,
                        duration,
                        error_message: Some("Request timeout".to_string()),
                    };
                }

                return DeliveryResult {
                    status: DeliveryStatus::Failure,
                    response_status: None,
                    duration,
                    error_message: Some(e.to_string()),
                };
            }
        };

        let duration = start.elapsed();
        let status_code = response.status();

        let status = classify_response(status_code);
        let error_message = match status {
            DeliveryStatus::Success => None,
            _ => Some(format!("Webhook responded with {}", status_code)),
        };

        DeliveryResult {
            status,
            response_status: Some(status_code.as_u16()),
            duration,
            error_message,
        }
    }
}

impl Default for WebhookDeliveryClient {
    fn default() -> Self {
        let client = Client::builder()
            .timeout(RetryConfig::default().timeout())
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

fn classify_response(status: StatusCode) -> DeliveryStatus {
    if status.is_success() {
        DeliveryStatus::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        DeliveryStatus::RateLimited
    } else if status.is_client_error() {
        DeliveryStatus::Rejected
    } else {
        DeliveryStatus::Failure
    }
}

/// Result of webhook delivery attempt
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub status: DeliveryStatus,
    pub response_status: Option<u16>,
    pub duration: Duration,
    pub error_message: Option<String>,
}

impl DeliveryResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, DeliveryStatus::Success)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.status,
            DeliveryStatus::Failure | DeliveryStatus::Timeout | DeliveryStatus::RateLimited
        )
    }
}
