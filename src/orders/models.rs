use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::pricing::PricingBreakdown;

/// Status written on intake; later transitions happen outside this service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
}

/// How the order is served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    #[default]
    DineIn,
    Takeaway,
    Delivery,
    RoomService,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::DineIn => "dine_in",
            ServiceType::Takeaway => "takeaway",
            ServiceType::Delivery => "delivery",
            ServiceType::RoomService => "room_service",
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound payload
// ---------------------------------------------------------------------------

/// Option or variant chosen by the customer, identified by name
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SelectedModifier {
    #[schema(example = "Grande")]
    pub name: String,
    /// Price shown to the customer, display only
    #[serde(default)]
    pub price: Option<f64>,
}

/// One cart line as sent by the storefront
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderLineRequest {
    #[validate(custom = "crate::validation::validate_uuid")]
    #[schema(example = "4f1c2a8e-6a43-4b7b-9a53-2f0c1f1d9e10")]
    pub id: String,
    #[validate(custom = "crate::validation::validate_item_name")]
    #[schema(example = "Thieboudienne")]
    pub name: String,
    /// Unit price shown to the customer, never used for totals
    #[validate(range(min = 0.0, message = "Le prix doit être positif ou nul"))]
    #[schema(example = 3500)]
    pub price: f64,
    #[validate(range(min = 1, max = 999, message = "La quantité doit être comprise entre 1 et 999"))]
    #[schema(example = 2)]
    pub quantity: i64,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default, rename = "selectedOption")]
    pub selected_option: Option<SelectedModifier>,
    #[serde(default, rename = "selectedVariant")]
    pub selected_variant: Option<SelectedModifier>,
}

/// Order intake body as sent by the storefront
///
/// Lines are validated one by one so that violation messages keep their order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderIntakeRequest {
    #[validate(
        length(min = 1, message = "Le panier ne peut pas être vide"),
        custom = "crate::validation::validate_cart_size"
    )]
    pub items: Vec<OrderLineRequest>,
    #[serde(default, rename = "tableNumber")]
    #[validate(length(max = 20, message = "Le numéro de table est trop long"))]
    pub table_number: Option<String>,
    #[serde(default, rename = "customerName")]
    #[validate(length(max = 100, message = "Le nom du client est trop long"))]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub service_type: Option<ServiceType>,
    #[serde(default)]
    #[validate(length(max = 50, message = "Le code promo est trop long"))]
    pub coupon_code: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500, message = "Les notes sont trop longues"))]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Validated intake
// ---------------------------------------------------------------------------

/// Strongly typed cart line, built only from a payload that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLineIntake {
    pub menu_item_id: Uuid,
    pub name: String,
    pub client_unit_price: f64,
    pub quantity: u32,
    pub category_name: Option<String>,
    pub selected_option: Option<String>,
    pub selected_variant: Option<String>,
}

/// Strongly typed order intake
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntake {
    pub lines: Vec<OrderLineIntake>,
    pub table_number: Option<String>,
    pub customer_name: Option<String>,
    pub service_type: ServiceType,
    /// Trimmed and upper-cased
    pub coupon_code: Option<String>,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Menu state
// ---------------------------------------------------------------------------

/// Variant replacing the base price of a menu item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuVariant {
    pub name: String,
    pub price: i64,
}

/// Option adding a price delta to a menu item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    pub name: String,
    #[serde(default)]
    pub price_delta: i64,
}

/// Live menu item as stored
#[derive(Debug, Clone, FromRow)]
pub struct MenuItem {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// Base unit price in minor units
    pub price: i64,
    pub is_available: bool,
    pub variants: Json<Vec<MenuVariant>>,
    pub options: Json<Vec<MenuOption>>,
}

/// Cart line re-priced from the live menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLine {
    pub menu_item_id: Uuid,
    pub name: String,
    pub quantity: u32,
    /// Server-trusted unit price at order time
    pub unit_price: i64,
    pub line_total: i64,
    pub selected_variant: Option<String>,
    pub selected_option: Option<String>,
}

/// Result of re-validating the cart against the live menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedItems {
    pub lines: Vec<ValidatedLine>,
    /// Server-trusted subtotal in minor units
    pub validated_total: i64,
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Everything needed to persist an order and its lines as one unit
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub tenant_id: Uuid,
    pub service_type: ServiceType,
    pub table_number: Option<String>,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    pub coupon_id: Option<Uuid>,
    pub pricing: PricingBreakdown,
    pub lines: Vec<ValidatedLine>,
}

/// Identity of a freshly persisted order
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct OrderCreated {
    pub order_id: Uuid,
    pub order_number: String,
    pub total: i64,
}

/// Human-readable order number, `YYYYMMDD-NNNN`
pub fn format_order_number(order_date: NaiveDate, sequence: i32) -> String {
    format!("{}-{:04}", order_date.format("%Y%m%d"), sequence)
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Success body of the intake endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedResponse {
    pub success: bool,
    pub order_id: Uuid,
    #[schema(example = "20261017-0042")]
    pub order_number: String,
    pub total: i64,
    pub subtotal: i64,
    pub tax_amount: i64,
    pub service_charge_amount: i64,
    pub discount_amount: i64,
    #[schema(example = "XOF")]
    pub currency: String,
}

impl OrderCreatedResponse {
    pub fn new(created: &OrderCreated, pricing: &PricingBreakdown, currency: &str) -> Self {
        Self {
            success: true,
            order_id: created.order_id,
            order_number: created.order_number.clone(),
            total: created.total,
            subtotal: pricing.subtotal,
            tax_amount: pricing.tax_amount,
            service_charge_amount: pricing.service_charge_amount,
            discount_amount: pricing.discount_amount,
            currency: currency.to_string(),
        }
    }
}
