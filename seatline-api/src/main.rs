use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use seatline_api::{app, AppState};
use seatline_core::SeatingService;
use seatline_domain::{Clock, SeatStore, SystemClock};
use seatline_store::app_config::Config;
use seatline_store::{DbClient, InMemorySeatStore, PostgresSeatStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "seatline_api=debug,seatline_core=debug,seatline_store=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Seatline API on port {}", config.server.port);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store: Arc<dyn SeatStore> = if config.database.is_memory() {
        tracing::warn!("Using in-memory store, data will not survive a restart");
        Arc::new(InMemorySeatStore::with_clock(clock.clone()))
    } else {
        let db = DbClient::new(&config.database.url, config.database.max_connections)
            .await
            .context("Failed to connect to Postgres")?;
        db.migrate().await.context("Failed to run migrations")?;
        Arc::new(PostgresSeatStore::with_clock(db.pool.clone(), clock.clone()))
    };

    let service = SeatingService::new(store, clock, config.inventory.confirm_policy);

    // Background expiry
    let shutdown = CancellationToken::new();
    let sweeper = service
        .sweeper(config.sweeper.interval())
        .spawn(shutdown.clone());

    let app = app(AppState::new(service));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("Server error")?;

    shutdown.cancel();
    sweeper.await.context("Expiration sweeper panicked")?;
    tracing::info!("Seatline API stopped");

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
        Err(e) => {
            // Without a signal handler the server only stops through the token.
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            shutdown.cancelled().await;
        }
    }
}
