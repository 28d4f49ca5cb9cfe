use std::net::SocketAddr;
use std::sync::Arc;

use dine_order::config::AppConfig;
use dine_order::rate_limit::{InMemoryRateLimitStore, RateLimitStore, RateLimiter, RedisRateLimitStore};
use dine_order::{create_router, db, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Dine Order API - Starting...");

    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    db::run_migrations(&db_pool).await?;

    let rate_limit_store: Arc<dyn RateLimitStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisRateLimitStore::connect(url).await?),
        None => {
            tracing::warn!("REDIS_URL not set, rate limit counters are kept in process memory");
            Arc::new(InMemoryRateLimitStore::new())
        }
    };
    let rate_limiter = RateLimiter::new(rate_limit_store, "orders", config.rate_limit);

    let state = AppState::with_postgres(db_pool, rate_limiter, &config.tenant_header);
    let app = create_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Dine Order API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
