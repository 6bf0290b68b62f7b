use std::sync::Arc;

use pulsewatch::config::{init_db, run_migrations, Config};
use pulsewatch::modules::monitor::{MonitorCrud, MonitorStore};
use pulsewatch::services::metrics::MonitorMetrics;
use pulsewatch::services::monitor::{CheckContext, HealthCheckExecutor, MonitorEngine};
use pulsewatch::services::webhook::{NotificationDispatcher, NotificationWorker, WebhookDeliveryClient};
use pulsewatch::{create_app, AppState};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulsewatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let db = init_db(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Connected to MySQL");
    run_migrations(&db).await?;

    let metrics = MonitorMetrics::new()?;
    let store: Arc<dyn MonitorStore> = Arc::new(MonitorCrud::new(db, config.heartbeat_retention_days));

    // Notification pipeline
    let (dispatcher, queue) = NotificationDispatcher::channel(
        Arc::clone(&store),
        Arc::clone(&metrics),
        config.notification_queue_capacity,
    );
    let retry_config = config.retry_config();
    let delivery_client = WebhookDeliveryClient::new(
        retry_config.timeout(),
        pulsewatch::services::webhook::delivery::DEFAULT_USER_AGENT,
    )?;
    let worker = NotificationWorker::new(queue, delivery_client, retry_config, Arc::clone(&metrics));
    let worker_handle = tokio::spawn(worker.run());

    // Monitoring engine
    let prober = HealthCheckExecutor::new(config.probe_timeout, &config.probe_user_agent)?;
    let engine = MonitorEngine::new(
        CheckContext {
            store: Arc::clone(&store),
            prober: Arc::new(prober),
            dispatcher,
            metrics: Arc::clone(&metrics),
        },
        config.tick_interval,
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine_handle = tokio::spawn(async move { engine.run(shutdown_rx).await });

    let app = create_app(AppState {
        store,
        metrics,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Engine owns the last dispatcher; once it stops the worker drains and exits
    shutdown_tx.send(true).ok();
    engine_handle.await?;
    worker_handle.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
