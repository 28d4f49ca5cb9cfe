use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ServiceError;

pub const COUPON_NOT_FOUND_MESSAGE: &str = "Code promo invalide";
pub const COUPON_INACTIVE_MESSAGE: &str = "Ce code n'est plus actif";
pub const COUPON_NOT_STARTED_MESSAGE: &str = "Ce code n'est pas encore valide";
pub const COUPON_EXPIRED_MESSAGE: &str = "Ce code a expiré";
pub const COUPON_WRONG_TENANT_MESSAGE: &str = "Ce code n'est pas valable pour ce restaurant";
pub const COUPON_EXHAUSTED_MESSAGE: &str = "Ce code a atteint sa limite d'utilisation";
pub const COUPONS_UNAVAILABLE_MESSAGE: &str = "Les codes promo ne sont pas disponibles pour ce restaurant";

/// How a coupon reduces the subtotal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `discount_value` is a percentage of the subtotal
    Percentage,
    /// `discount_value` is an amount in minor units
    Fixed,
}

/// Coupon row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Coupon {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount: Option<i64>,
    pub min_subtotal: Option<i64>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Coupon {
    /// Discount granted on `subtotal`, never negative
    pub fn discount_for(&self, subtotal: i64) -> i64 {
        let amount = match self.discount_type {
            DiscountType::Percentage => {
                let percent = self.discount_value.max(Decimal::ZERO).min(Decimal::ONE_HUNDRED);
                let raw = (Decimal::from(subtotal.max(0)) * percent / Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                    .to_i64()
                    .unwrap_or(0);
                match self.max_discount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            DiscountType::Fixed => self
                .discount_value
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
                .unwrap_or(0),
        };
        amount.max(0)
    }
}

/// Outcome of validating a coupon code against an order
#[derive(Debug, Clone, PartialEq)]
pub struct CouponValidationResult {
    pub valid: bool,
    pub discount_amount: i64,
    pub error: Option<String>,
    pub coupon: Option<Coupon>,
}

impl CouponValidationResult {
    pub fn accepted(coupon: Coupon, discount_amount: i64) -> Self {
        Self {
            valid: true,
            discount_amount,
            error: None,
            coupon: Some(coupon),
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            discount_amount: 0,
            error: Some(error.into()),
            coupon: None,
        }
    }

    /// Turn a rejection into a client error carrying the rejection message verbatim
    pub fn into_discount(self) -> Result<(Coupon, i64), ServiceError> {
        match (self.valid, self.coupon) {
            (true, Some(coupon)) => Ok((coupon, self.discount_amount)),
            _ => Err(ServiceError::validation(
                self.error.unwrap_or_else(|| COUPON_NOT_FOUND_MESSAGE.to_string()),
            )),
        }
    }
}

/// Apply the coupon rules in order: existence, active window, tenant scope,
/// minimum subtotal, usage cap. The first failing rule wins.
pub fn evaluate_coupon(
    coupon: Option<Coupon>,
    tenant_id: Uuid,
    subtotal: i64,
    now: DateTime<Utc>,
) -> CouponValidationResult {
    let Some(coupon) = coupon else {
        return CouponValidationResult::rejected(COUPON_NOT_FOUND_MESSAGE);
    };

    if !coupon.is_active {
        return CouponValidationResult::rejected(COUPON_INACTIVE_MESSAGE);
    }
    if coupon.starts_at.is_some_and(|starts_at| starts_at > now) {
        return CouponValidationResult::rejected(COUPON_NOT_STARTED_MESSAGE);
    }
    if coupon.expires_at.is_some_and(|expires_at| expires_at <= now) {
        return CouponValidationResult::rejected(COUPON_EXPIRED_MESSAGE);
    }

    if coupon.tenant_id != tenant_id {
        return CouponValidationResult::rejected(COUPON_WRONG_TENANT_MESSAGE);
    }

    if let Some(min_subtotal) = coupon.min_subtotal {
        if subtotal < min_subtotal {
            return CouponValidationResult::rejected(format!(
                "Une commande minimum de {} est requise pour ce code",
                min_subtotal
            ));
        }
    }

    if let Some(limit) = coupon.usage_limit {
        if coupon.used_count >= limit {
            return CouponValidationResult::rejected(COUPON_EXHAUSTED_MESSAGE);
        }
    }

    let discount = coupon.discount_for(subtotal);
    CouponValidationResult::accepted(coupon, discount)
}
