//! In-memory notification hub
//!
//! Architecture:
//! 1. Subscriber: one live connection with an optional user id and role
//! 2. Registry: all subscribers plus by-user and by-role indexes
//! 3. Broker: publish API and connection lifecycle, shared by every transport
//!
//! Delivery is best-effort: a full mailbox drops the payload for that
//! subscriber instead of blocking the publisher.

pub mod broker;
pub mod registry;
pub mod subscriber;

pub use broker::{Broker, Subscription};
pub use registry::{PublishReport, Registry, RegistryStats, Target};
pub use subscriber::{
    channel, Delivery, DeliveryChannel, Identity, Mailbox, Payload, Subscriber, SubscriberId,
    SubscriberInfo, Transport,
};
