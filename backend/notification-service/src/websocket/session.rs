use crate::hub::{Broker, SubscriberId, Subscription};
use actix_ws::{Message, MessageStream, Session};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Why the outbound pump stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    /// Subscriber was unregistered (inbound side ended or broker shut down)
    Unregistered,
    /// Writing to the socket failed
    WriteFailed,
}

/// Start both pumps for an upgraded connection
///
/// Must be called from within the actix runtime: the message stream is bound
/// to the worker thread that accepted the request.
pub fn spawn_pumps(
    subscription: Subscription,
    session: Session,
    messages: MessageStream,
    broker: Broker,
    heartbeat: Duration,
) {
    let id = subscription.id();
    let inbound = actix_web::rt::spawn(inbound_pump(id, broker, session.clone(), messages));

    actix_web::rt::spawn(async move {
        let cause = outbound_pump(subscription, session, heartbeat).await;
        inbound.abort();
        debug!(subscriber = %id, ?cause, "websocket connection closed");
    });
}

async fn outbound_pump(
    mut subscription: Subscription,
    mut session: Session,
    heartbeat: Duration,
) -> CloseCause {
    let mut ticker = time::interval_at(Instant::now() + heartbeat, heartbeat);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let cause = loop {
        tokio::select! {
            next = subscription.recv() => match next {
                Some(payload) => {
                    if session.text(payload.as_str().to_owned()).await.is_err() {
                        break CloseCause::WriteFailed;
                    }
                }
                None => break CloseCause::Unregistered,
            },
            _ = ticker.tick() => {
                if session.ping(b"").await.is_err() {
                    break CloseCause::WriteFailed;
                }
            }
        }
    };

    if cause == CloseCause::WriteFailed {
        warn!(subscriber = %subscription.id(), "websocket write failed, dropping connection");
    }
    subscription.close();
    // Err here only means the peer already closed
    let _ = session.close(None).await;
    cause
}

async fn inbound_pump(
    id: SubscriberId,
    broker: Broker,
    mut session: Session,
    mut messages: MessageStream,
) {
    while let Some(frame) = messages.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                debug!(subscriber = %id, text = %text, "websocket text frame received");
            }
            Ok(Message::Binary(bytes)) => {
                debug!(subscriber = %id, len = bytes.len(), "websocket binary frame received");
            }
            Ok(Message::Ping(bytes)) => {
                if session.pong(&bytes).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(reason)) => {
                debug!(subscriber = %id, ?reason, "websocket closed by client");
                break;
            }
            Ok(Message::Pong(_)) | Ok(Message::Continuation(_)) | Ok(Message::Nop) => {}
            Err(err) => {
                warn!(subscriber = %id, error = %err, "websocket read failed");
                break;
            }
        }
    }

    broker.disconnect(id);
}
