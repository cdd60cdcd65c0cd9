//! Notification dispatch trait and implementations.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Fire-and-forget delivery of notifications.
///
/// Notifications are sent after a commit; a delivery failure never undoes it,
/// so implementations report failures themselves.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) {
        tracing::info!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            "notification dispatched"
        );
    }
}

/// In-memory notifier that records what was sent.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    sent: Arc<RwLock<Vec<Notification>>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.read().unwrap().clone()
    }

    /// Returns the notifications sent to `recipient`.
    pub fn sent_to(&self, recipient: &str) -> Vec<Notification> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, notification: Notification) {
        self.sent.write().unwrap().push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_notifications() {
        let notifier = InMemoryNotifier::new();
        notifier
            .notify(Notification::new("a@example.com", "Hello", "body"))
            .await;
        notifier
            .notify(Notification::new("b@example.com", "Hi", "body"))
            .await;

        assert_eq!(notifier.sent().len(), 2);
        assert_eq!(notifier.sent_to("a@example.com")[0].subject, "Hello");
    }
}
