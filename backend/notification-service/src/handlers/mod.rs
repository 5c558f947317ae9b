//! HTTP handlers for the notification hub
pub mod events;
pub mod publish;
pub mod websocket;

use actix_web::web;

pub use events::register_routes as register_events;
pub use publish::register_routes as register_publish;
pub use websocket::register_routes as register_websocket;

/// Mount every hub route: streaming endpoints, operator API, health and metrics
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(|| async { "OK" }))
        .route("/metrics", web::get().to(crate::metrics::serve_metrics));
    register_events(cfg);
    register_websocket(cfg);
    register_publish(cfg);
}
