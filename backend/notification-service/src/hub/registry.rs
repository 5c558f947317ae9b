/// Subscriber registry
///
/// Tracks every live subscriber plus two secondary indexes (by user, by role),
/// all kept consistent under a single reader/writer lock. The lock is never
/// held across an await point: delivery under the shared lock is a
/// non-blocking `try_send` per target.
use super::subscriber::{Delivery, Payload, Subscriber, SubscriberId, SubscriberInfo, Transport};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Addressing mode of a published event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    All,
    Role(String),
    User(String),
}

impl Target {
    pub fn label(&self) -> &'static str {
        match self {
            Target::All => "all",
            Target::Role(_) => "role",
            Target::User(_) => "user",
        }
    }
}

/// Outcome counters of one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Subscribers addressed by the target
    pub matched: usize,
    pub delivered: usize,
    /// Mailbox was full
    pub dropped: usize,
    /// Mailbox receiver already gone
    pub closed: usize,
}

impl PublishReport {
    fn record(&mut self, outcome: Delivery) {
        self.matched += 1;
        match outcome {
            Delivery::Queued => self.delivered += 1,
            Delivery::Dropped => self.dropped += 1,
            Delivery::Closed => self.closed += 1,
        }
    }
}

/// Registry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub event_stream: usize,
    pub websocket: usize,
    pub users: usize,
    pub roles: usize,
}

#[derive(Default)]
struct Indexes {
    all: HashMap<SubscriberId, Subscriber>,
    by_user: HashMap<String, HashSet<SubscriberId>>,
    by_role: HashMap<String, HashSet<SubscriberId>>,
}

impl Indexes {
    fn select(&self, target: &Target) -> Vec<&Subscriber> {
        match target {
            Target::All => self.all.values().collect(),
            Target::Role(role) => self.resolve(self.by_role.get(role)),
            Target::User(user_id) => self.resolve(self.by_user.get(user_id)),
        }
    }

    fn resolve(&self, bucket: Option<&HashSet<SubscriberId>>) -> Vec<&Subscriber> {
        bucket
            .into_iter()
            .flatten()
            .filter_map(|id| self.all.get(id))
            .collect()
    }
}

fn index(map: &mut HashMap<String, HashSet<SubscriberId>>, key: &str, id: SubscriberId) {
    map.entry(key.to_owned()).or_default().insert(id);
}

fn unindex(map: &mut HashMap<String, HashSet<SubscriberId>>, key: &str, id: SubscriberId) {
    if let Some(bucket) = map.get_mut(key) {
        bucket.remove(&id);
        if bucket.is_empty() {
            map.remove(key);
        }
    }
}

#[derive(Default)]
pub struct Registry {
    inner: RwLock<Indexes>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a subscriber into `all` and into whichever secondary indexes its
    /// identity addresses
    pub fn register(&self, subscriber: Subscriber) {
        let id = subscriber.id();
        let mut guard = self.inner.write();

        if let Some(user_id) = subscriber.user_id() {
            index(&mut guard.by_user, user_id, id);
        }
        if let Some(role) = subscriber.role() {
            index(&mut guard.by_role, role, id);
        }
        guard.all.insert(id, subscriber);
    }

    /// Remove a subscriber from every index, pruning buckets that become empty
    ///
    /// Returns the removed subscriber, or `None` when it was not registered
    /// (a repeated unregister). Dropping the returned value closes its
    /// delivery channel; the guard is released before that happens.
    pub fn unregister(&self, id: SubscriberId) -> Option<Subscriber> {
        let mut guard = self.inner.write();
        let subscriber = guard.all.remove(&id)?;

        if let Some(user_id) = subscriber.user_id() {
            unindex(&mut guard.by_user, user_id, id);
        }
        if let Some(role) = subscriber.role() {
            unindex(&mut guard.by_role, role, id);
        }
        Some(subscriber)
    }

    /// Offer a payload to every subscriber addressed by `target`
    pub fn deliver(&self, target: &Target, payload: &Payload) -> PublishReport {
        let guard = self.inner.read();
        let mut report = PublishReport::default();

        for subscriber in guard.select(target) {
            report.record(subscriber.channel().offer(payload.clone()));
        }
        report
    }

    pub fn lookup(&self, target: &Target) -> Vec<SubscriberInfo> {
        let guard = self.inner.read();
        guard.select(target).into_iter().map(Subscriber::info).collect()
    }

    pub fn lookup_all(&self) -> Vec<SubscriberInfo> {
        self.lookup(&Target::All)
    }

    pub fn lookup_by_user(&self, user_id: &str) -> Vec<SubscriberInfo> {
        self.lookup(&Target::User(user_id.to_owned()))
    }

    pub fn lookup_by_role(&self, role: &str) -> Vec<SubscriberInfo> {
        self.lookup(&Target::Role(role.to_owned()))
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.inner.read().all.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> RegistryStats {
        let guard = self.inner.read();
        let event_stream = guard
            .all
            .values()
            .filter(|s| s.transport() == Transport::EventStream)
            .count();

        RegistryStats {
            total: guard.all.len(),
            event_stream,
            websocket: guard.all.len() - event_stream,
            users: guard.by_user.len(),
            roles: guard.by_role.len(),
        }
    }

    /// Unregister everyone, returning the removed subscribers
    pub fn clear(&self) -> Vec<Subscriber> {
        let mut guard = self.inner.write();
        guard.by_user.clear();
        guard.by_role.clear();
        guard.all.drain().map(|(_, subscriber)| subscriber).collect()
    }

    #[cfg(test)]
    fn bucket_sizes(&self) -> (Vec<usize>, Vec<usize>) {
        let guard = self.inner.read();
        (
            guard.by_user.values().map(HashSet::len).collect(),
            guard.by_role.values().map(HashSet::len).collect(),
        )
    }
}
