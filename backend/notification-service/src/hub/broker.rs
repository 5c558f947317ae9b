/// Notification broker
///
/// Single entry point for publishing events and for attaching/detaching
/// subscribers. The broker is a cheap handle around shared state: clone it into
/// every transport and every publish call site.
use super::registry::{PublishReport, Registry, RegistryStats, Target};
use super::subscriber::{
    channel, Identity, Mailbox, Payload, Subscriber, SubscriberId, SubscriberInfo, Transport,
};
use crate::metrics;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time;
use tracing::{debug, info};

#[derive(Clone, Default)]
pub struct Broker {
    registry: Arc<Registry>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and hand back its receiving side
    ///
    /// The returned [`Subscription`] unregisters itself when dropped.
    pub fn connect(&self, identity: Identity, transport: Transport, capacity: usize) -> Subscription {
        let (tx, mailbox) = channel(capacity);
        let subscriber = Subscriber::new(identity, transport, tx);
        let id = subscriber.id();

        debug!(
            subscriber = %id,
            user_id = subscriber.user_id().unwrap_or_default(),
            role = subscriber.role().unwrap_or_default(),
            transport = transport.as_str(),
            "subscriber connected"
        );

        self.registry.register(subscriber);
        metrics::subscriber_connected(transport);

        Subscription {
            id,
            mailbox,
            broker: self.clone(),
        }
    }

    /// Unregister a subscriber and close its delivery channel
    ///
    /// Returns `false` if it was already gone.
    pub fn disconnect(&self, id: SubscriberId) -> bool {
        match self.registry.unregister(id) {
            Some(subscriber) => {
                metrics::subscriber_disconnected(subscriber.transport());
                debug!(
                    subscriber = %id,
                    transport = subscriber.transport().as_str(),
                    "subscriber disconnected"
                );
                true
            }
            None => false,
        }
    }

    pub fn publish(&self, target: &Target, payload: Payload) -> PublishReport {
        let report = self.registry.deliver(target, &payload);
        metrics::record_publish(target.label(), &report);

        if report.dropped > 0 {
            debug!(
                target = target.label(),
                dropped = report.dropped,
                "mailboxes full, payload dropped for some subscribers"
            );
        }
        report
    }

    pub fn publish_all(&self, payload: impl Into<Payload>) -> PublishReport {
        self.publish(&Target::All, payload.into())
    }

    /// Deliver to every subscriber whose role matches exactly
    pub fn publish_to_role(&self, role: &str, payload: impl Into<Payload>) -> PublishReport {
        self.publish(&Target::Role(role.to_owned()), payload.into())
    }

    pub fn publish_to_user(&self, user_id: &str, payload: impl Into<Payload>) -> PublishReport {
        self.publish(&Target::User(user_id.to_owned()), payload.into())
    }

    pub fn is_connected(&self, id: SubscriberId) -> bool {
        self.registry.contains(id)
    }

    pub fn subscribers(&self) -> Vec<SubscriberInfo> {
        self.registry.lookup_all()
    }

    pub fn subscribers_for_user(&self, user_id: &str) -> Vec<SubscriberInfo> {
        self.registry.lookup_by_user(user_id)
    }

    pub fn subscribers_for_role(&self, role: &str) -> Vec<SubscriberInfo> {
        self.registry.lookup_by_role(role)
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// Unregister every subscriber, closing all mailboxes
    ///
    /// Transport loops observe the closed mailbox and unwind.
    pub fn shutdown(&self) -> usize {
        let closed = self.close_all();
        info!(subscribers = closed, "broker shut down");
        closed
    }

    /// Keep closing subscribers every `sweep` until `stopped` resolves
    ///
    /// Connections accepted while the server is winding down are closed by a
    /// later sweep, so a graceful stop never waits on an open stream.
    pub async fn drain_until<F>(&self, stopped: F, sweep: Duration) -> usize
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(stopped);
        let mut ticker = time::interval(sweep);
        let mut closed = 0;

        loop {
            tokio::select! {
                _ = &mut stopped => break,
                _ = ticker.tick() => closed += self.close_all(),
            }
        }
        closed += self.close_all();
        info!(subscribers = closed, "broker drained");
        closed
    }

    fn close_all(&self) -> usize {
        let removed = self.registry.clear();
        for subscriber in &removed {
            metrics::subscriber_disconnected(subscriber.transport());
        }
        removed.len()
    }
}

/// Receiving side of a registered subscriber
///
/// Owned by the transport task serving the connection. Dropping it
/// unregisters the subscriber, so every exit path tears down exactly once.
pub struct Subscription {
    id: SubscriberId,
    mailbox: Mailbox,
    broker: Broker,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Payload> {
        self.mailbox.recv().await
    }

    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<Payload>> {
        self.mailbox.poll_recv(cx)
    }

    /// Next queued payload without waiting
    pub fn try_recv(&mut self) -> Option<Payload> {
        self.mailbox.try_recv()
    }

    /// Unregister now; later calls and the eventual drop are no-ops
    pub fn close(&self) -> bool {
        self.broker.disconnect(self.id)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broker.disconnect(self.id);
    }
}
