/// WebSocket endpoint for real-time notifications
///
/// Endpoint: GET /ws?user_id=<id>&role=<role>
///
/// Both parameters are required; the request is rejected with 400 before the
/// upgrade when either is missing.
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use crate::config::StreamSettings;
use crate::hub::{Broker, Transport};
use crate::models::StreamQuery;
use crate::websocket::spawn_pumps;

pub async fn websocket(
    req: HttpRequest,
    payload: web::Payload,
    query: web::Query<StreamQuery>,
    broker: web::Data<Broker>,
    settings: web::Data<StreamSettings>,
) -> ActixResult<HttpResponse> {
    let identity = query.into_inner().require_identity()?;
    let (response, session, messages) = actix_ws::handle(&req, payload)?;

    info!(
        user_id = identity.user_id.as_deref().unwrap_or_default(),
        role = identity.role.as_deref().unwrap_or_default(),
        "websocket connection upgraded"
    );

    let subscription = broker.connect(
        identity,
        Transport::WebSocket,
        settings.ws_channel_capacity,
    );
    spawn_pumps(
        subscription,
        session,
        messages,
        broker.get_ref().clone(),
        settings.heartbeat_interval,
    );

    Ok(response)
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(websocket));
}
