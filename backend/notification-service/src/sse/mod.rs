//! Server-Sent-Events transport
//!
//! One long-lived `text/event-stream` response per subscriber: a reconnect
//! hint first, then data frames as events arrive and comment frames as
//! keep-alives. The subscriber is unregistered when the response body is
//! dropped (client gone, server stopping) or when its mailbox is closed.

pub mod frame;
pub mod stream;

pub use stream::EventStream;
