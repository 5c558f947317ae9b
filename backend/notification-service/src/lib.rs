pub mod config;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod sse;
pub mod websocket;

pub use config::{Config, StreamSettings};
pub use error::{AppError, Result};
pub use hub::{Broker, Identity, Payload, PublishReport, Subscription, Target, Transport};
pub use services::OrderNotifier;
