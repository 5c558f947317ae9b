/// Subscribers and their delivery channels
///
/// A subscriber is one live streaming connection. It owns the sending half of a
/// bounded mailbox; the transport that created it owns the receiving half.
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Opaque connection handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Pre-serialized event body
///
/// Cloning is a reference-count bump, so a single publish can fan out to any
/// number of subscribers without copying the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(Arc<str>);

impl Payload {
    /// Serialize any value to a JSON payload
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_string(value).map(Self::from)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which front end a subscriber connected through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    EventStream,
    WebSocket,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::EventStream => "sse",
            Transport::WebSocket => "websocket",
        }
    }
}

impl Serialize for Transport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Addressing attributes of a subscriber
///
/// Empty strings are normalized to `None`: such a subscriber is only reachable
/// through broadcast-all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: Option<String>,
    pub role: Option<String>,
}

impl Identity {
    pub fn new(user_id: Option<String>, role: Option<String>) -> Self {
        Self {
            user_id: user_id.filter(|value| !value.is_empty()),
            role: role.filter(|value| !value.is_empty()),
        }
    }

    /// Identity reachable only through broadcast-all
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self::new(Some(user_id.into()), None)
    }

    pub fn role(role: impl Into<String>) -> Self {
        Self::new(None, Some(role.into()))
    }

    pub fn with_role(self, role: impl Into<String>) -> Self {
        Self::new(self.user_id, Some(role.into()))
    }
}

/// Result of offering one payload to one delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Mailbox at capacity, the payload is discarded for this subscriber
    Dropped,
    /// Receiving side already gone
    Closed,
}

/// Producer side of a subscriber's bounded mailbox
#[derive(Debug)]
pub struct DeliveryChannel {
    sender: mpsc::Sender<Payload>,
}

/// Consumer side of a subscriber's bounded mailbox
#[derive(Debug)]
pub struct Mailbox {
    receiver: mpsc::Receiver<Payload>,
}

/// Create a bounded delivery channel
///
/// A capacity of zero is raised to one.
pub fn channel(capacity: usize) -> (DeliveryChannel, Mailbox) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (DeliveryChannel { sender }, Mailbox { receiver })
}

impl DeliveryChannel {
    /// Non-blocking enqueue with drop-on-full
    pub fn offer(&self, payload: Payload) -> Delivery {
        match self.sender.try_send(payload) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl Mailbox {
    /// Next payload, or `None` once the subscriber has been unregistered and
    /// everything queued before that has been drained
    pub async fn recv(&mut self) -> Option<Payload> {
        self.receiver.recv().await
    }

    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<Payload>> {
        self.receiver.poll_recv(cx)
    }

    pub fn try_recv(&mut self) -> Option<Payload> {
        self.receiver.try_recv().ok()
    }
}

/// One live connection as seen by the registry
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    identity: Identity,
    transport: Transport,
    connected_at: DateTime<Utc>,
    channel: DeliveryChannel,
}

impl Subscriber {
    pub fn new(identity: Identity, transport: Transport, channel: DeliveryChannel) -> Self {
        Self {
            id: SubscriberId::new(),
            identity,
            transport,
            connected_at: Utc::now(),
            channel,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.identity.user_id.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.identity.role.as_deref()
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn channel(&self) -> &DeliveryChannel {
        &self.channel
    }

    pub fn info(&self) -> SubscriberInfo {
        SubscriberInfo {
            id: self.id,
            user_id: self.identity.user_id.clone(),
            role: self.identity.role.clone(),
            transport: self.transport,
            connected_at: self.connected_at,
        }
    }
}

/// Point-in-time view of a subscriber, detached from its channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberInfo {
    pub id: SubscriberId,
    pub user_id: Option<String>,
    pub role: Option<String>,
    pub transport: Transport,
    pub connected_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_normalizes_empty_fields() {
        let identity = Identity::new(Some(String::new()), Some("admin".to_string()));
        assert_eq!(identity.user_id, None);
        assert_eq!(identity.role.as_deref(), Some("admin"));

        assert_eq!(Identity::new(None, Some(String::new())), Identity::anonymous());
    }

    #[test]
    fn test_offer_drops_when_full() {
        let (tx, mut rx) = channel(2);

        assert_eq!(tx.offer("a".into()), Delivery::Queued);
        assert_eq!(tx.offer("b".into()), Delivery::Queued);
        assert_eq!(tx.offer("c".into()), Delivery::Dropped);

        assert_eq!(rx.try_recv().unwrap().as_str(), "a");
        assert_eq!(rx.try_recv().unwrap().as_str(), "b");
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_offer_reports_closed_mailbox() {
        let (tx, rx) = channel(1);
        drop(rx);

        assert!(tx.is_closed());
        assert_eq!(tx.offer("late".into()), Delivery::Closed);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let (tx, _rx) = channel(0);
        assert_eq!(tx.capacity(), 1);
    }

    #[tokio::test]
    async fn test_mailbox_ends_when_sender_dropped() {
        let (tx, mut rx) = channel(4);
        tx.offer("last".into());
        drop(tx);

        assert_eq!(rx.recv().await.unwrap().as_str(), "last");
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_payload_json() {
        let payload = Payload::json(&serde_json::json!({"x": 1})).unwrap();
        assert_eq!(payload.as_str(), r#"{"x":1}"#);
    }
}
