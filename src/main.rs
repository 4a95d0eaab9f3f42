//! parking-gateway server entry point.
//!
//! Starts the Axum HTTP server, the expiration sweeper and, when enabled,
//! the PostgreSQL event log writer. On shutdown the sweeper is joined first,
//! then the writer flushes buffered events.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use parking_gateway::api;
use parking_gateway::app_state::AppState;
use parking_gateway::config::ServiceConfig;
use parking_gateway::domain::{Clock, EventBus, SystemClock};
use parking_gateway::persistence::{PostgresPersistence, spawn_event_writer};
use parking_gateway::service::{ExpirationSweeper, FacilityService, ReservationService, Stores};

const EVENT_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ServiceConfig::from_env().context("invalid LISTEN_ADDR")?;
    tracing::info!(addr = %config.listen_addr, "starting parking-gateway");

    // Build domain layer
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let lifecycle = config.lifecycle();
    let stores = Stores::in_memory(clock, lifecycle.policy);
    let event_bus = EventBus::new(config.event_bus_capacity);

    // Event log
    let mut event_writer = None;
    if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("connecting to the event log database")?;
        let persistence = PostgresPersistence::new(pool);
        persistence.migrate().await?;
        if config.cleanup_after_days > 0 {
            let removed = persistence
                .delete_old_events(config.cleanup_after_days)
                .await?;
            tracing::info!(removed, days = config.cleanup_after_days, "pruned old events");
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = spawn_event_writer(persistence, event_bus.subscribe(), stop_rx);
        event_writer = Some((stop_tx, handle));
        tracing::info!("event log enabled");
    }

    // Build service layer
    let reservation_service = Arc::new(ReservationService::new(
        stores.clone(),
        event_bus.clone(),
        lifecycle,
    ));
    let facility_service = Arc::new(FacilityService::new(stores, event_bus.clone()));

    // Expiration sweeper
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = ExpirationSweeper::new(Arc::clone(&reservation_service), config.sweep_interval())
        .spawn(shutdown_rx);

    // Build application state
    let app_state = AppState {
        reservation_service,
        facility_service,
        event_bus,
    };

    // Build router
    let app = Router::new().merge(api::build_router());
    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::doc::ApiDoc::openapi()),
        )
    };
    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(err) = sweeper.await {
        tracing::warn!(error = %err, "sweeper task ended abnormally");
    }

    // The sweeper has published its last event; flush the log after it.
    if let Some((stop_tx, mut writer)) = event_writer {
        let _ = stop_tx.send(true);
        match tokio::time::timeout(EVENT_FLUSH_TIMEOUT, &mut writer).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, "event writer ended abnormally"),
            Err(_) => {
                tracing::warn!("event log flush timed out, aborting writer");
                writer.abort();
            }
        }
    }
    tracing::info!("server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
