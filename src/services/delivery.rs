use deadpool_postgres::Pool;
use std::time::Duration;
use uuid::Uuid;

use crate::services::{with_deadline, ConversationService};
use crate::websocket::events::WebSocketEvent;
use crate::websocket::{ConnectionRegistry, SendOutcome};

/// Pushes committed conversation events to live counterparts.
///
/// Strictly best-effort: failures are logged and never reach the write path.
#[derive(Clone)]
pub struct DeliveryCoordinator {
    db: Pool,
    registry: ConnectionRegistry,
    /// Bound on the recipient lookup.
    deadline: Duration,
}

impl DeliveryCoordinator {
    pub fn new(db: Pool, registry: ConnectionRegistry, deadline: Duration) -> Self {
        Self {
            db,
            registry,
            deadline,
        }
    }

    /// Fire-and-forget variant used by request handlers after commit.
    pub fn dispatch(&self, conversation_id: Uuid, actor_id: Uuid, event: WebSocketEvent) {
        let this = self.clone();
        tokio::spawn(async move {
            this.deliver(conversation_id, actor_id, event, false).await;
        });
    }

    /// Resolves the counterparts of `actor_id` and pushes `event` to each.
    /// Returns how many endpoints accepted it.
    pub async fn deliver(
        &self,
        conversation_id: Uuid,
        actor_id: Uuid,
        event: WebSocketEvent,
        visible_only: bool,
    ) -> usize {
        let lookup =
            ConversationService::counterparts(&self.db, conversation_id, actor_id, visible_only);
        let recipients = match with_deadline(self.deadline, lookup).await {
                Ok(recipients) => recipients,
                Err(e) => {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        event = event.event_type(),
                        error = %e,
                        "could not resolve recipients, skipping push"
                    );
                    return 0;
                }
            };

        self.push_to(&recipients, conversation_id, actor_id, &event)
            .await
    }

    pub async fn push_to(
        &self,
        recipients: &[Uuid],
        conversation_id: Uuid,
        actor_id: Uuid,
        event: &WebSocketEvent,
    ) -> usize {
        if recipients.is_empty() {
            return 0;
        }

        let payload = match event.to_payload(conversation_id, actor_id) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(event = event.event_type(), error = %e, "failed to encode event");
                return 0;
            }
        };

        let mut delivered = 0;
        for recipient in recipients {
            if self.registry.send_to_user(*recipient, payload.clone()).await == SendOutcome::Delivered {
                delivered += 1;
            }
        }

        tracing::debug!(
            conversation_id = %conversation_id,
            event = event.event_type(),
            recipients = recipients.len(),
            delivered,
            "event pushed"
        );
        delivered
    }
}
