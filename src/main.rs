//! Fixline back-office service
//!
//! Main application entry point

use std::sync::Arc;

use tracing::info;

use fixline::{
    api::{build_router, AppState},
    config::Settings,
    crm::client::CrmClient,
    database::{connection, DatabaseService},
    services::ServiceFactory,
    utils::logging,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging
    logging::init_logging(&settings.logging)?;

    info!("Starting {}...", fixline::info());

    // Initialize database connection
    info!("Connecting to database...");
    let db_config = connection::DatabaseConfig {
        url: settings.database.url.clone(),
        max_connections: settings.database.max_connections,
        min_connections: settings.database.min_connections,
        ..Default::default()
    };
    let pool = connection::create_pool(&db_config).await?;

    // Run database migrations
    connection::run_migrations(&pool).await?;

    // Initialize database service
    let db = DatabaseService::new(pool.clone());

    // Initialize CRM gateway
    let crm = Arc::new(CrmClient::new(&settings)?);

    // Initialize services
    info!("Initializing services...");
    let services = ServiceFactory::new(pool.clone(), db.clone(), crm, settings.clone())?;

    let state = AppState {
        pool,
        db,
        services,
        settings: settings.clone(),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.server.bind_addr).await?;
    info!("Listening on {}", settings.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Fixline stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install ctrl-c handler");
        return;
    }
    info!("Shutdown signal received");
}
