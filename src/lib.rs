// Multi-tenant order intake service
//
// One public pipeline, POST /api/orders: admission control, tenant resolution,
// payload validation, menu re-pricing, coupon rules, pricing, transactional
// persistence and best-effort post-commit side effects.

pub mod config;
pub mod coupons;
pub mod db;
pub mod error;
pub mod inventory;
pub mod orders;
pub mod pricing;
pub mod rate_limit;
pub mod tenant;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;


use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::coupons::{CouponRepository, CouponService};
use crate::db::DbPool;
use crate::error::{ApiError, ErrorBody};
use crate::inventory::{InventoryRepository, InventoryService, PgNotificationChannel};
use crate::orders::{
    MenuRepository, OrderCreatedResponse, OrderIntakeRequest, OrderLineRequest, OrderService,
    OrderSideEffects, OrdersRepository, SelectedModifier, ServiceType,
};
use crate::rate_limit::RateLimiter;
use crate::tenant::TenantRepository;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        orders::handlers::create_order_handler,
        health_check,
    ),
    components(
        schemas(
            OrderIntakeRequest,
            OrderLineRequest,
            SelectedModifier,
            ServiceType,
            OrderCreatedResponse,
            ErrorBody,
            HealthResponse
        )
    ),
    tags(
        (name = "orders", description = "Storefront order intake"),
        (name = "health", description = "Liveness")
    ),
    info(
        title = "Dine Order API",
        version = "1.0.0",
        description = "Order intake and pricing for multi-tenant restaurant storefronts"
    )
)]
pub struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Absent when every collaborator is an in-process fake
    pub db: Option<DbPool>,
    pub tenant_header: Arc<str>,
    pub rate_limiter: RateLimiter,
    pub order_service: OrderService,
    pub coupon_service: CouponService,
    pub side_effects: OrderSideEffects,
}

impl AppState {
    /// Wire every collaborator to PostgreSQL
    pub fn with_postgres(pool: DbPool, rate_limiter: RateLimiter, tenant_header: &str) -> Self {
        let coupon_service = CouponService::new(Arc::new(CouponRepository::new(pool.clone())));
        let inventory_service = InventoryService::new(
            Arc::new(InventoryRepository::new(pool.clone())),
            Arc::new(PgNotificationChannel::new(pool.clone())),
        );
        let order_service = OrderService::new(
            Arc::new(TenantRepository::new(pool.clone())),
            Arc::new(MenuRepository::new(pool.clone())),
            Arc::new(OrdersRepository::new(pool.clone())),
        );

        Self {
            db: Some(pool),
            tenant_header: Arc::from(tenant_header),
            rate_limiter,
            order_service,
            side_effects: OrderSideEffects::new(inventory_service, coupon_service.clone()),
            coupon_service,
        }
    }
}

/// Health check body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "up")]
    pub database: String,
    #[schema(example = "redis")]
    pub rate_limiter: String,
}

/// Handler for GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match &state.db {
        Some(pool) => match db::ping(pool).await {
            Ok(()) => "up",
            Err(e) => {
                tracing::error!("Health check database ping failed: {}", e);
                "down"
            }
        },
        None => "unconfigured",
    };

    let status = if database == "down" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status,
        Json(HealthResponse {
            status: if status == StatusCode::OK { "ok" } else { "degraded" }.to_string(),
            database: database.to_string(),
            rate_limiter: state.rate_limiter.backend_name().to_string(),
        }),
    )
}

/// Turn a handler panic into the generic internal error body
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Internal(format!("handler panicked: {}", detail)).into_response()
}

/// Creates and configures the application router
pub fn create_router(state: AppState) -> Router {
    // Storefronts live on tenant subdomains
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/orders", post(orders::create_order_handler))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(cors),
        )
        .with_state(state)
}
