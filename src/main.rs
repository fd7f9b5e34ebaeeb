use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use central_admin::{
    app::{app, AppState},
    config,
    database::{DatabaseManager, PgRepository},
    services::LogMailer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL and friends are picked up locally
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting central admin in {:?} mode", config.environment);
    if central_admin::is_production!() && config.security.jwt_secret.is_empty() {
        anyhow::bail!("SECURITY_JWT_SECRET must be set in production");
    }

    let database = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    if config.database.run_migrations {
        database.migrate().await.context("failed to run migrations")?;
    }

    let state = AppState::new(
        Arc::new(PgRepository::new(database.pool().clone())),
        Arc::new(LogMailer),
    );

    let bind_addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("Central admin listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    database.close().await;
    Ok(())
}
