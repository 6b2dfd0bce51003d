//! Real-time notification fan-out.
//!
//! The engine only talks to a [`NotificationChannel`]. [`NotificationHub`] is the in-process
//! implementation: one live subscriber per user, fed through an unbounded tokio channel. Dispatch is
//! best-effort: offline recipients are skipped and delivery failures are logged and dropped.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::types::{UserId, UserSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Dislike,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub actor_id: UserId,
    pub actor: UserSummary,
    /// Post or comment the interaction happened on.
    pub target_id: String,
    pub recipient_id: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(
        kind: NotificationKind,
        actor: UserSummary,
        recipient_id: impl Into<UserId>,
        target_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            actor_id: actor.id.clone(),
            actor,
            target_id: target_id.into(),
            recipient_id: recipient_id.into(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Live connection of a user, as returned by [`NotificationChannel::is_online`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub user_id: UserId,
    pub connection_id: Uuid,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("subscriber {connection_id} for user {user_id} disconnected")]
    Disconnected { user_id: UserId, connection_id: Uuid },
}

/// Notification delivery collaborator.
pub trait NotificationChannel: Send + Sync {
    fn is_online(&self, user_id: &str) -> Option<ChannelHandle>;

    fn send(&self, handle: &ChannelHandle, event: &NotificationEvent) -> Result<(), DeliveryError>;
}

#[derive(Debug)]
struct Subscriber {
    connection_id: Uuid,
    sender: mpsc::UnboundedSender<NotificationEvent>,
}

/// Receiving end handed to a connected user.
#[derive(Debug)]
pub struct Subscription {
    pub connection_id: Uuid,
    receiver: mpsc::UnboundedReceiver<NotificationEvent>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<NotificationEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<NotificationEvent> {
        self.receiver.try_recv().ok()
    }

    /// Drains every event delivered so far.
    pub fn drain(&mut self) -> Vec<NotificationEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Process-wide registry of live subscribers, shared through an `Arc`.
#[derive(Debug, Default)]
pub struct NotificationHub {
    subscribers: RwLock<HashMap<UserId, Subscriber>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Registers a live connection for `user_id`, replacing any previous one.
    pub fn connect(&self, user_id: impl Into<UserId>) -> Subscription {
        let user_id = user_id.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        let connection_id = Uuid::new_v4();
        let previous = self.subscribers.write().insert(
            user_id.clone(),
            Subscriber {
                connection_id,
                sender,
            },
        );
        if previous.is_some() {
            debug!("replaced notification subscriber for {user_id}");
        }
        Subscription {
            connection_id,
            receiver,
        }
    }

    /// Removes the subscriber if `connection_id` is still the live one. Stale ids are ignored.
    pub fn disconnect(&self, user_id: &str, connection_id: Uuid) -> bool {
        let mut subscribers = self.subscribers.write();
        if subscribers
            .get(user_id)
            .is_some_and(|subscriber| subscriber.connection_id == connection_id)
        {
            subscribers.remove(user_id);
            return true;
        }
        false
    }

    pub fn online_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl NotificationChannel for NotificationHub {
    fn is_online(&self, user_id: &str) -> Option<ChannelHandle> {
        self.subscribers
            .read()
            .get(user_id)
            .filter(|subscriber| !subscriber.sender.is_closed())
            .map(|subscriber| ChannelHandle {
                user_id: user_id.to_string(),
                connection_id: subscriber.connection_id,
            })
    }

    fn send(&self, handle: &ChannelHandle, event: &NotificationEvent) -> Result<(), DeliveryError> {
        let disconnected = || DeliveryError::Disconnected {
            user_id: handle.user_id.clone(),
            connection_id: handle.connection_id,
        };
        let subscribers = self.subscribers.read();
        let subscriber = subscribers
            .get(&handle.user_id)
            .filter(|subscriber| subscriber.connection_id == handle.connection_id)
            .ok_or_else(disconnected)?;
        subscriber.sender.send(event.clone()).map_err(|_| disconnected())
    }
}

/// Routes events to recipients through the injected channel.
#[derive(Clone)]
pub struct Dispatcher {
    channel: Arc<dyn NotificationChannel>,
}

impl Dispatcher {
    pub fn new(channel: Arc<dyn NotificationChannel>) -> Self {
        Self { channel }
    }

    /// Never fails: self-notifications are skipped, offline recipients get nothing and delivery
    /// failures are only logged.
    pub fn dispatch(&self, event: NotificationEvent) {
        if event.recipient_id == event.actor_id {
            return;
        }
        let Some(handle) = self.channel.is_online(&event.recipient_id) else {
            debug!("{} is offline, dropping {:?} notification", event.recipient_id, event.kind);
            return;
        };
        if let Err(err) = self.channel.send(&handle, &event) {
            warn!("notification delivery failed: {err}");
        }
    }
}
