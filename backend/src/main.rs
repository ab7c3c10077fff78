//! Sales Tracker - Backend Server
//!
//! Records field-sales visits to consignment customers, reconciles the stock
//! left at each store, and reports sales and profit.

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use chrono_tz::Tz;
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod external;
mod handlers;
mod jobs;
mod middleware;
mod routes;
mod services;
mod time;

pub use config::Config;

use external::{PushGatewayClient, PushTransport};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    /// Business timezone for day boundaries
    pub tz: Tz,
    /// Push delivery; `None` disables notifications
    pub push: Option<Arc<dyn PushTransport>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sales_tracker_server=debug,tower_http=debug,sqlx=warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("SALES_LOG_FORMAT").as_deref() == Ok("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Load configuration
    let config = config::Config::load()?;
    let tz = config.schedule.tz()?;

    tracing::info!("Starting Sales Tracker Server");
    tracing::info!("Environment: {}, timezone: {}", config.environment, tz);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    tokio::fs::create_dir_all(&config.uploads.dir).await?;

    let push: Option<Arc<dyn PushTransport>> = match PushGatewayClient::from_config(&config.push)? {
        Some(client) => {
            tracing::info!("Push gateway enabled");
            Some(Arc::new(client) as Arc<dyn PushTransport>)
        }
        None => {
            tracing::warn!("No push gateway configured, notifications are disabled");
            None
        }
    };

    // Create application state
    let state = AppState {
        db: db_pool,
        config: Arc::new(config.clone()),
        tz,
        push,
    };

    if config.schedule.enabled {
        jobs::spawn_scheduler(state.clone())?;
    }

    // Build application
    let app = create_app(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = match state
        .config
        .cors
        .frontend_url
        .as_deref()
        .and_then(|url| url.parse::<axum::http::HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let uploads = ServeDir::new(&state.config.uploads.dir);
    let body_limit = state.config.uploads.max_body_bytes;

    Router::new()
        .route("/", get(root))
        .nest("/api", routes::api_routes(state.clone()))
        .nest_service("/uploads", uploads)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CompressionLayer::new())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Sales Tracker API"
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
