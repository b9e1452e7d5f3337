//! Campus Library Server - Library Management System
//!
//! A Rust REST API server for campus library management.

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campuslib_server::{api, config::AppConfig, repository::Repository, services::Services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("campuslib_server={},tower_http=debug", config.logging.level).into()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Campus Library Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(
        repository,
        config.circulation.clone(),
        config.seating.clone(),
        config.email.clone(),
    )
    .await
    .expect("Failed to create services");

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Catalog
        .route("/books", get(api::books::list_books))
        .route("/books", post(api::books::create_book))
        .route("/books/:code", get(api::books::get_book))
        .route("/books/:code", put(api::books::update_book))
        .route("/books/:code", delete(api::books::delete_book))
        .route("/books/:code/rack", patch(api::books::assign_rack))
        .route("/books/:code/audit", get(api::books::audit_trail))
        // Borrow records
        .route("/borrow-records", get(api::borrows::list_records))
        .route("/borrow-records/borrow", post(api::borrows::borrow))
        .route("/borrow-records/admin-analytics", get(api::stats::admin_analytics))
        .route("/borrow-records/daily-traffic", get(api::stats::daily_traffic))
        .route("/borrow-records/:id", get(api::borrows::get_record))
        .route("/borrow-records/:id", patch(api::borrows::update_record))
        .route("/borrow-records/:id/return", patch(api::borrows::return_book))
        .route("/borrow-records/:id/extend", patch(api::borrows::extend))
        .route("/borrow-records/:id/fine/paid", patch(api::borrows::mark_fine_paid))
        .route("/borrow-records/:id/fine/waived", patch(api::borrows::waive_fine))
        .route("/borrow-records/:id/reminder", post(api::borrows::send_reminder))
        // Activity logs (scanner)
        .route("/activity-logs/check-in", post(api::activity::check_in))
        .route("/activity-logs/check-out", post(api::activity::check_out))
        .route("/activity-logs/transfer", post(api::activity::transfer))
        .route("/activity-logs/seats", get(api::activity::seat_availability))
        .route("/activity-logs/analytics", get(api::activity::student_analytics))
        .route("/activity-logs/leaderboard", get(api::activity::leaderboard))
        // Notifications
        .route("/notifications", get(api::notifications::list_notifications))
        .route("/notifications/:id/read", patch(api::notifications::mark_read))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api", api)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
