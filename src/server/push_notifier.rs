//! Push notifier — webhook delivery of task update events.
//!
//! Every status and artifact update for a task with a registered
//! [`PushNotificationConfig`] is POSTed to the configured URL with the same
//! JSON payload as the SSE frame (without the JSON-RPC envelope). Delivery
//! is fire-and-forget: it runs on its own tokio task, retries with
//! exponential backoff, and never blocks the SSE fan-out or the handler.
//! Delivery is at-least-once; consumers deduplicate by
//! `(taskId, status.timestamp)`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::types::PushNotificationConfig;

use super::subscription_hub::EventPayload;

/// Default maximum delivery attempts per event.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default base backoff delay.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(250);

/// Default backoff cap.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Delivers task update events to registered webhook URLs.
pub struct PushNotifier {
    client: reqwest::Client,
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for PushNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PushNotifier {
    /// Create a notifier with the default retry policy
    /// (5 attempts, 250 ms × 2^k backoff capped at 30 s).
    pub fn new() -> Self {
        Self::with_policy(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }

    /// Create a notifier with a custom retry policy.
    pub fn with_policy(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Queue an event for delivery. Returns immediately; delivery and
    /// retries run on a spawned task.
    pub fn notify(self: &Arc<Self>, config: PushNotificationConfig, payload: EventPayload) {
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            notifier.deliver(config, payload).await;
        });
    }

    async fn deliver(&self, config: PushNotificationConfig, payload: EventPayload) {
        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let backoff = self
                    .base_delay
                    .saturating_mul(1u32 << (attempt - 1).min(20))
                    .min(self.max_delay);
                tokio::time::sleep(backoff).await;
            }

            let mut request = self
                .client
                .post(&config.url)
                .header("Content-Type", "application/json")
                .json(payload.as_ref());

            if let Some(header) = Self::authorization_header(&config) {
                request = request.header("Authorization", header);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(url = %config.url, attempt = attempt + 1, "Push notification delivered");
                    return;
                }
                Ok(response) => {
                    warn!(
                        url = %config.url,
                        status = %response.status(),
                        attempt = attempt + 1,
                        "Push notification endpoint returned non-success status"
                    );
                }
                Err(e) => {
                    warn!(
                        url = %config.url,
                        error = %e,
                        attempt = attempt + 1,
                        "Push notification request failed"
                    );
                }
            }
        }

        warn!(
            url = %config.url,
            attempts = self.max_attempts,
            "Push notification delivery gave up"
        );
    }

    /// Build the `Authorization` header from the config: the bare `token`
    /// wins as a bearer credential, else the first recognized scheme from
    /// `authentication`.
    fn authorization_header(config: &PushNotificationConfig) -> Option<String> {
        if let Some(ref token) = config.token {
            return Some(format!("Bearer {}", token));
        }
        let auth = config.authentication.as_ref()?;
        let credentials = auth.credentials.as_ref()?;
        for scheme in &auth.schemes {
            match scheme.to_ascii_lowercase().as_str() {
                "bearer" => return Some(format!("Bearer {}", credentials)),
                "basic" => return Some(format!("Basic {}", credentials)),
                _ => {}
            }
        }
        None
    }
}
