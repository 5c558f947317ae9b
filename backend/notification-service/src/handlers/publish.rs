/// Operator endpoints for pushing events and inspecting the hub
///
/// The JSON request body becomes the event payload.
use actix_web::{web, HttpResponse, Result as ActixResult};
use serde_json::json;

use crate::error::AppError;
use crate::hub::{Broker, Payload, PublishReport};
use crate::models::Notification;
use crate::services::OrderNotifier;

fn encode(body: &serde_json::Value) -> Result<Payload, AppError> {
    Ok(Payload::json(body)?)
}

fn published(report: PublishReport) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "report": report,
    }))
}

/// Endpoint: POST /api/v1/notifications/publish
pub async fn publish_all(
    broker: web::Data<Broker>,
    body: web::Json<serde_json::Value>,
) -> ActixResult<HttpResponse> {
    let payload = encode(&body)?;
    Ok(published(broker.publish_all(payload)))
}

/// Endpoint: POST /api/v1/notifications/publish/role/{role}
pub async fn publish_to_role(
    path: web::Path<String>,
    broker: web::Data<Broker>,
    body: web::Json<serde_json::Value>,
) -> ActixResult<HttpResponse> {
    let payload = encode(&body)?;
    Ok(published(broker.publish_to_role(&path, payload)))
}

/// Endpoint: POST /api/v1/notifications/publish/user/{user_id}
pub async fn publish_to_user(
    path: web::Path<String>,
    broker: web::Data<Broker>,
    body: web::Json<serde_json::Value>,
) -> ActixResult<HttpResponse> {
    let payload = encode(&body)?;
    Ok(published(broker.publish_to_user(&path, payload)))
}

/// Push an order-created notification to every connected admin
///
/// Endpoint: POST /api/v1/notifications/orders/created
pub async fn order_created(
    notifier: web::Data<OrderNotifier>,
    body: web::Json<Notification>,
) -> ActixResult<HttpResponse> {
    Ok(published(notifier.order_created(&body)?))
}

/// Push an order status change to the customer who placed the order
///
/// Endpoint: POST /api/v1/notifications/orders/status
pub async fn order_status_changed(
    notifier: web::Data<OrderNotifier>,
    body: web::Json<Notification>,
) -> ActixResult<HttpResponse> {
    Ok(published(notifier.order_status_changed(&body)?))
}

/// Endpoint: GET /api/v1/notifications/stream/stats
pub async fn stream_stats(broker: web::Data<Broker>) -> HttpResponse {
    HttpResponse::Ok().json(broker.stats())
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/notifications")
            .route("/publish", web::post().to(publish_all))
            .route("/publish/role/{role}", web::post().to(publish_to_role))
            .route("/publish/user/{user_id}", web::post().to(publish_to_user))
            .route("/orders/created", web::post().to(order_created))
            .route("/orders/status", web::post().to(order_status_changed))
            .route("/stream/stats", web::get().to(stream_stats)),
    );
}
