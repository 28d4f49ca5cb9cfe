use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::coupons::{evaluate_coupon, CouponStore, CouponValidationResult};
use crate::error::StoreError;

/// Service for coupon validation and usage accounting
#[derive(Clone)]
pub struct CouponService {
    store: Arc<dyn CouponStore>,
}

impl CouponService {
    /// Create a new CouponService
    pub fn new(store: Arc<dyn CouponStore>) -> Self {
        Self { store }
    }

    /// Validate a coupon code for an order of `subtotal` at `tenant_id`
    ///
    /// A rejected code is a normal outcome (`valid == false`), only a store
    /// failure is an error.
    pub async fn validate_coupon(
        &self,
        code: &str,
        tenant_id: Uuid,
        subtotal: i64,
    ) -> Result<CouponValidationResult, StoreError> {
        let coupon = self.store.find_by_code(tenant_id, code).await?;
        let result = evaluate_coupon(coupon, tenant_id, subtotal, Utc::now());

        if let Some(reason) = &result.error {
            tracing::info!("Coupon '{}' rejected for tenant {}: {}", code, tenant_id, reason);
        }

        Ok(result)
    }

    /// Count one use of a coupon after its order was persisted
    pub async fn increment_usage(&self, coupon_id: Uuid) -> Result<(), StoreError> {
        if !self.store.increment_usage(coupon_id).await? {
            tracing::warn!("Coupon {} vanished before its usage could be counted", coupon_id);
        }
        Ok(())
    }
}
