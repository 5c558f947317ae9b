//! WebSocket transport
//!
//! Each upgraded connection runs two tasks:
//! 1. Outbound pump: mailbox -> text frames, plus periodic pings
//! 2. Inbound pump: reads client frames (logged only) until close or error
//!
//! Either side ending unregisters the subscriber; the outbound pump owns the
//! socket and closes it once.

pub mod session;

pub use session::{spawn_pumps, CloseCause};
