use actix_web::{web, App, HttpServer};
use notification_service::{handlers, logging, metrics, Broker, Config, OrderNotifier};
use std::io;
use std::time::Duration;

#[actix_web::main]
async fn main() -> io::Result<()> {
    logging::init_tracing();

    let config = Config::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let settings = config.stream_settings();

    // One broker per process, shared by both transports and every publisher
    let broker = Broker::new();
    let notifier = OrderNotifier::new(broker.clone(), config.admin_role.clone());

    tracing::info!(
        sse_capacity = settings.sse_channel_capacity,
        ws_capacity = settings.ws_channel_capacity,
        heartbeat_secs = settings.heartbeat_interval.as_secs(),
        admin_role = %config.admin_role,
        "notification hub initialized"
    );

    let broker_data = web::Data::new(broker.clone());
    let notifier_data = web::Data::new(notifier);
    let settings_data = web::Data::new(settings);

    let addr = config.bind_addr();
    tracing::info!("Starting HTTP server on {}", addr);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(broker_data.clone())
            .app_data(notifier_data.clone())
            .app_data(settings_data.clone())
            .wrap(metrics::MetricsMiddleware)
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure)
    })
    .disable_signals()
    .shutdown_timeout(config.shutdown_timeout_secs)
    .bind(&addr)?
    .run();

    let handle = server.handle();
    actix_web::rt::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received, closing streams");
        // Stop accepting first, then keep ending open event streams and
        // websockets until the workers have finished
        let stopping = handle.stop(true);
        broker.drain_until(stopping, Duration::from_millis(100)).await;
    });

    server.await
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    }
}
