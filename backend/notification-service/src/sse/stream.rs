use super::frame;
use crate::hub::Subscription;
use actix_web::web::Bytes;
use futures::Stream;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Response body of one event-stream connection
///
/// Each poll waits on the subscriber's mailbox and the heartbeat timer.
/// Dropping the stream drops the [`Subscription`], which unregisters it.
pub struct EventStream {
    subscription: Subscription,
    heartbeat: Interval,
    retry: Option<Duration>,
    finished: bool,
}

impl EventStream {
    pub fn new(subscription: Subscription, heartbeat: Duration, retry: Duration) -> Self {
        let mut heartbeat = time::interval_at(Instant::now() + heartbeat, heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            subscription,
            heartbeat,
            retry: Some(retry),
            finished: false,
        }
    }
}

impl Stream for EventStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        if let Some(retry) = this.retry.take() {
            return Poll::Ready(Some(Ok(frame::retry(retry))));
        }

        match this.subscription.poll_recv(cx) {
            Poll::Ready(Some(payload)) => {
                return Poll::Ready(Some(Ok(frame::data(payload.as_str()))));
            }
            Poll::Ready(None) => {
                debug!(
                    subscriber = %this.subscription.id(),
                    "mailbox closed, ending event stream"
                );
                this.finished = true;
                return Poll::Ready(None);
            }
            Poll::Pending => {}
        }

        match this.heartbeat.poll_tick(cx) {
            Poll::Ready(_) => Poll::Ready(Some(Ok(frame::ping()))),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{Broker, Identity, Transport};
    use futures::StreamExt;
    use tokio_test::{assert_pending, assert_ready, task};

    const RETRY: Duration = Duration::from_millis(5000);

    #[tokio::test]
    async fn test_retry_hint_then_data() {
        let broker = Broker::new();
        let subscription = broker.connect(Identity::user("U1"), Transport::EventStream, 8);
        let mut stream = task::spawn(EventStream::new(
            subscription,
            Duration::from_secs(25),
            RETRY,
        ));

        assert_eq!(
            assert_ready!(stream.poll_next()),
            Some(Ok(Bytes::from_static(b"retry: 5000\n\n")))
        );
        assert_pending!(stream.poll_next());

        broker.publish_to_user("U1", r#"{"x":1}"#);
        assert!(stream.is_woken());
        assert_eq!(
            assert_ready!(stream.poll_next()),
            Some(Ok(Bytes::from_static(b"data: {\"x\":1}\n\n")))
        );
        assert_pending!(stream.poll_next());
    }

    #[tokio::test]
    async fn test_idle_stream_emits_heartbeats() {
        let broker = Broker::new();
        let subscription = broker.connect(Identity::role("admin"), Transport::EventStream, 8);
        let id = subscription.id();
        let mut stream = EventStream::new(subscription, Duration::from_millis(20), RETRY);

        assert_eq!(stream.next().await, Some(Ok(frame::retry(RETRY))));
        for _ in 0..3 {
            let next = time::timeout(Duration::from_secs(2), stream.next())
                .await
                .expect("heartbeat did not fire");
            assert_eq!(next, Some(Ok(frame::ping())));
        }
        assert!(broker.is_connected(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_heartbeat_keeps_idle_stream_alive() {
        let settings = crate::config::StreamSettings::default();
        let broker = Broker::new();
        let subscription = broker.connect(
            Identity::new(Some("U1".into()), Some("user".into())),
            Transport::EventStream,
            settings.sse_channel_capacity,
        );
        let id = subscription.id();
        let mut stream =
            EventStream::new(subscription, settings.heartbeat_interval, settings.sse_retry);

        assert_eq!(stream.next().await, Some(Ok(frame::retry(RETRY))));

        let deadline = Instant::now() + Duration::from_secs(60);
        let mut pings = 0;
        while let Ok(next) = time::timeout_at(deadline, stream.next()).await {
            assert_eq!(next, Some(Ok(frame::ping())));
            pings += 1;
        }

        assert!(pings >= 2, "only {} heartbeats in 60s", pings);
        assert!(broker.is_connected(id));
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let broker = Broker::new();
        let subscription = broker.connect(Identity::role("admin"), Transport::EventStream, 8);
        let stream = EventStream::new(subscription, Duration::from_secs(25), RETRY);
        assert_eq!(broker.stats().total, 1);

        drop(stream);
        assert_eq!(broker.stats().total, 0);
        assert_eq!(broker.publish_to_role("admin", "late").matched, 0);
    }

    #[tokio::test]
    async fn test_shutdown_ends_stream() {
        let broker = Broker::new();
        let subscription = broker.connect(Identity::anonymous(), Transport::EventStream, 8);
        let mut stream = EventStream::new(subscription, Duration::from_secs(25), RETRY);
        stream.next().await;

        broker.publish_all("before-shutdown");
        broker.shutdown();

        assert_eq!(
            stream.next().await,
            Some(Ok(Bytes::from_static(b"data: before-shutdown\n\n")))
        );
        assert_eq!(stream.next().await, None);
        assert_eq!(stream.next().await, None);
    }
}
