//! Best-effort webhook notifications.
//!
//! Notifications are never allowed to fail a step: callers dispatch them on
//! a detached task via [`Notifier::dispatch`] and the delivery outcome is
//! only ever logged.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::ExternalServiceError;

/// Events published to the notification webhook.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    FounderOnboarded {
        session_id: Uuid,
        founder_id: Uuid,
        email: String,
    },
    ScoringCompleted {
        session_id: Uuid,
        venture_id: Uuid,
        total_score: f64,
    },
}

/// Webhook notifier. With no webhook configured every send is a silent no-op.
pub struct Notifier {
    webhook: Option<String>,
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(webhook: Option<String>) -> Self {
        Self {
            webhook,
            client: reqwest::Client::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Deliver one event. Used directly by tests; production callers go
    /// through [`dispatch`](Self::dispatch).
    pub async fn send(&self, event: &NotificationEvent) -> Result<(), ExternalServiceError> {
        let Some(ref url) = self.webhook else {
            return Ok(());
        };
        let resp = self
            .client
            .post(url)
            .json(event)
            .send()
            .await
            .map_err(|e| ExternalServiceError::NotifyFailed {
                reason: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(ExternalServiceError::NotifyFailed {
                reason: format!("webhook returned {}", resp.status()),
            });
        }
        Ok(())
    }

    /// Fire-and-forget delivery on a detached task. Failures are logged and
    /// have no propagation path back to the caller.
    pub fn dispatch(self: &Arc<Self>, event: NotificationEvent) {
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&event).await {
                warn!(error = %e, ?event, "Notification delivery failed");
            }
        });
    }
}
