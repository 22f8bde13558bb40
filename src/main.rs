mod app_state;
mod config;
mod db;
mod models;
mod routes;
mod services;

use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::auth::AuthKeys;
use services::billing::RedisCreditLedger;
use services::orchestrator::ScrapeOrchestrator;
use services::queue::{JobQueue, RedisJobQueue};
use services::audit::AuditSink;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing scrape-gateway server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("scrape_requests_total", "Total scrape requests received");
    metrics::describe_counter!(
        "scrape_timeouts_total",
        "Scrape requests that exceeded the caller's wait bound"
    );
    metrics::describe_counter!(
        "scrape_billing_failures_total",
        "Completed scrapes whose billing debit was refused"
    );
    metrics::describe_histogram!(
        "scrape_duration_seconds",
        "Wall-clock time from submission to delivered result"
    );

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize Redis job queue and credit ledger
    tracing::info!("Connecting to Redis job queue");
    let queue =
        Arc::new(RedisJobQueue::new(&config.redis_url).expect("Failed to initialize job queue"));

    let ledger = Arc::new(
        RedisCreditLedger::new(&config.redis_url).expect("Failed to initialize credit ledger"),
    );

    // Audit records flow through a channel to a background Postgres writer
    let audit = AuditSink::postgres(db_pool.clone());

    let orchestrator = ScrapeOrchestrator::new(
        queue.clone() as Arc<dyn JobQueue>,
        ledger,
        audit,
        config.orchestrator(),
    );

    let auth = AuthKeys::new(&config.jwt_secret);

    // Create shared application state
    let state = AppState::new(db_pool, queue, orchestrator, auth);

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/v1/scrape", post(routes::scrape::scrape))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(256 * 1024)); // JSON bodies only

    tracing::info!("Starting scrape-gateway on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
