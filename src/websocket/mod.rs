use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::metrics::{self, PushOutcome};

pub mod events;
pub mod message_types;

/// Failure of a single write to a live endpoint.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("endpoint closed")]
    Closed,
    #[error("endpoint mailbox full")]
    Full,
}

/// A live transport endpoint handed to the registry by the connection layer.
///
/// `send` must not block: it either enqueues the payload or fails.
pub trait Endpoint: Send + Sync {
    fn send(&self, payload: String) -> Result<(), EndpointError>;
    fn close(&self);
}

/// Identifies one registration, so a stale connection never evicts the one
/// that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

struct Registration {
    id: ConnectionId,
    endpoint: Arc<dyn Endpoint>,
}

/// Observable result of a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// No live connection for the user; expected, not an error.
    Offline,
    /// The write failed and the registration was removed.
    Evicted,
}

/// In-process registry of at most one live endpoint per user.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    // user_id -> current registration
    inner: Arc<RwLock<HashMap<Uuid, Registration>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `endpoint` for `user_id`, replacing any previous one.
    ///
    /// The replaced endpoint is not closed here; its own connection lifecycle
    /// owns that.
    pub async fn join(&self, user_id: Uuid, endpoint: Arc<dyn Endpoint>) -> ConnectionId {
        let id = ConnectionId::new();
        let mut guard = self.inner.write().await;
        let replaced = guard.insert(user_id, Registration { id, endpoint });

        if replaced.is_some() {
            tracing::debug!(user_id = %user_id, "replaced existing connection");
        } else {
            metrics::HUB_ONLINE_CONNECTIONS.inc();
        }
        tracing::debug!(user_id = %user_id, online = guard.len(), "user joined");
        id
    }

    /// Removes whatever is registered for `user_id`. Idempotent.
    pub async fn leave(&self, user_id: Uuid) {
        let mut guard = self.inner.write().await;
        if guard.remove(&user_id).is_some() {
            metrics::HUB_ONLINE_CONNECTIONS.dec();
            tracing::debug!(user_id = %user_id, online = guard.len(), "user left");
        }
    }

    /// Removes the registration only if it is still `connection_id`.
    ///
    /// Returns false when a newer connection has taken the slot.
    pub async fn release(&self, user_id: Uuid, connection_id: ConnectionId) -> bool {
        let mut guard = self.inner.write().await;
        match guard.get(&user_id) {
            Some(reg) if reg.id == connection_id => {
                guard.remove(&user_id);
                metrics::HUB_ONLINE_CONNECTIONS.dec();
                tracing::debug!(user_id = %user_id, online = guard.len(), "connection released");
                true
            }
            _ => false,
        }
    }

    /// Pushes `payload` to the user's live endpoint. A failed write evicts and
    /// closes the endpoint.
    pub async fn send_to_user(&self, user_id: Uuid, payload: String) -> SendOutcome {
        let target = {
            let guard = self.inner.read().await;
            guard
                .get(&user_id)
                .map(|reg| (reg.id, Arc::clone(&reg.endpoint)))
        };

        let Some((connection_id, endpoint)) = target else {
            tracing::debug!(user_id = %user_id, "no live connection for user");
            metrics::record_push(PushOutcome::Offline);
            return SendOutcome::Offline;
        };

        match endpoint.send(payload) {
            Ok(()) => {
                metrics::record_push(PushOutcome::Delivered);
                SendOutcome::Delivered
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "push failed, evicting connection");
                // An evicted endpoint must not stay open outside the hub; closing it
                // makes the client reconnect and rejoin.
                self.release(user_id, connection_id).await;
                endpoint.close();
                metrics::record_push(PushOutcome::Evicted);
                SendOutcome::Evicted
            }
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.read().await.contains_key(&user_id)
    }

    pub async fn online_count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Drops every registration and asks each endpoint to close.
    pub async fn shutdown(&self) {
        let drained: Vec<(Uuid, Registration)> = {
            let mut guard = self.inner.write().await;
            guard.drain().collect()
        };
        metrics::HUB_ONLINE_CONNECTIONS.sub(drained.len() as i64);
        for (user_id, reg) in drained {
            tracing::debug!(user_id = %user_id, "closing connection on shutdown");
            reg.endpoint.close();
        }
    }
}
