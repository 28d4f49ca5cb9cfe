// HTTP handlers for order endpoints

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;

use crate::coupons::COUPONS_UNAVAILABLE_MESSAGE;
use crate::error::{ApiError, ServiceError};
use crate::orders::OrderCreatedResponse;
use crate::pricing::calculate_order_total;
use crate::rate_limit::client_ip;
use crate::tenant::resolve_tenant;
use crate::validation::parse_order_intake;
use crate::AppState;

/// Handler for POST /api/orders
/// Places an order on the storefront of the tenant named by the routing header
///
/// Every response carries the rate limit headers, including rejections.
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = crate::orders::OrderIntakeRequest,
    params(
        ("x-tenant-slug" = String, Header, description = "Tenant slug set by the edge router")
    ),
    responses(
        (status = 200, description = "Order placed", body = OrderCreatedResponse),
        (status = 400, description = "Invalid order, cart or coupon", body = crate::error::ErrorBody,
            example = json!({"error": "Données de commande invalides", "details": ["Le panier ne peut pas être vide"]})),
        (status = 403, description = "Restaurant closed or feature not in plan", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown restaurant", body = crate::error::ErrorBody,
            example = json!({"error": "Restaurant introuvable"})),
        (status = 409, description = "Concurrent update while loading the restaurant or menu, retry", body = crate::error::ErrorBody),
        (status = 429, description = "Too many requests", body = crate::error::ErrorBody,
            example = json!({"error": "Trop de requêtes. Veuillez réessayer dans quelques instants."})),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody,
            example = json!({"error": "Erreur serveur"}))
    ),
    tag = "orders"
)]
pub async fn create_order_handler(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let client = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let decision = state.rate_limiter.check(&client).await;

    let mut response = if decision.success {
        match place_order(&state, &headers, &body).await {
            Ok(created) => (StatusCode::OK, Json(created)).into_response(),
            Err(err) => err.into_response(),
        }
    } else {
        tracing::warn!("Rate limit exceeded on order intake");
        ApiError::RateLimited.into_response()
    };

    decision.apply_headers(response.headers_mut());
    response
}

/// The intake pipeline once admission control let the request through
///
/// Stages run strictly in order and the first failure ends the request.
/// Nothing is persisted before every check passed.
async fn place_order(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<OrderCreatedResponse, ApiError> {
    let slug = resolve_tenant(headers, &state.tenant_header)?;
    let intake = parse_order_intake(body)?;

    let tenant = state.order_service.validate_tenant(&slug).await?;
    let items = state
        .order_service
        .validate_order_items(tenant.id, &intake.lines)
        .await?;

    let mut coupon_id = None;
    let mut discount = 0;
    if let Some(code) = intake.coupon_code.as_deref() {
        if !tenant.features.coupons {
            return Err(ServiceError::forbidden(COUPONS_UNAVAILABLE_MESSAGE).into());
        }
        let (coupon, amount) = state
            .coupon_service
            .validate_coupon(code, tenant.id, items.validated_total)
            .await?
            .into_discount()?;
        coupon_id = Some(coupon.id);
        discount = amount;
    }

    let pricing = calculate_order_total(items.validated_total, &tenant.fiscal, discount);

    let created = state
        .order_service
        .create_order_with_items(&tenant, &intake, &items, pricing, coupon_id)
        .await?;

    let response = OrderCreatedResponse::new(&created, &pricing, &tenant.fiscal.currency);
    state
        .side_effects
        .dispatch(tenant.id, &created, &items.lines, coupon_id);

    Ok(response)
}
