/// Server-Sent-Events endpoint
///
/// Endpoint: GET /events?user_id=<id>&role=<role>
///
/// Both parameters are optional; a connection without them only receives
/// broadcast-all events.
use actix_web::{http::header, web, HttpResponse};
use tracing::info;

use crate::config::StreamSettings;
use crate::hub::{Broker, Transport};
use crate::models::StreamQuery;
use crate::sse::EventStream;

pub async fn event_stream(
    query: web::Query<StreamQuery>,
    broker: web::Data<Broker>,
    settings: web::Data<StreamSettings>,
) -> HttpResponse {
    let identity = query.into_inner().identity();
    info!(
        user_id = identity.user_id.as_deref().unwrap_or_default(),
        role = identity.role.as_deref().unwrap_or_default(),
        "event stream opened"
    );

    let subscription = broker.connect(
        identity,
        Transport::EventStream,
        settings.sse_channel_capacity,
    );
    let stream = EventStream::new(subscription, settings.heartbeat_interval, settings.sse_retry);

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(stream)
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/events", web::get().to(event_stream));
}
