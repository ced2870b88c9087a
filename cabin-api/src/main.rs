use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use cabin_api::{app, AppState};
use cabin_booking::BookingService;
use cabin_store::{app_config::Config, DbClient, SqliteBookingStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cabin_api=debug,cabin_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Cabin API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to open booking database")?;
    db.migrate().await.context("Failed to run migrations")?;

    let store = Arc::new(SqliteBookingStore::new(db.pool.clone()));
    let service = BookingService::new(config.cabin.clone(), store)
        .await
        .context("Failed to restore bookings")?;
    let occupancy = service.occupancy();
    tracing::info!(
        "Cabin ready: {} free, {} reserved",
        occupancy.free,
        occupancy.reserved
    );

    let app = app(AppState::new(service));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
