use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::coupons::Coupon;
use crate::error::StoreError;

/// Access to coupon rows
#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Look a code up, preferring the tenant's own coupon when several share it
    async fn find_by_code(&self, tenant_id: Uuid, code: &str) -> Result<Option<Coupon>, StoreError>;

    /// Atomically add one use; returns false when the coupon no longer exists
    async fn increment_usage(&self, coupon_id: Uuid) -> Result<bool, StoreError>;
}

/// Repository for coupon operations
#[derive(Clone)]
pub struct CouponRepository {
    pool: PgPool,
}

impl CouponRepository {
    /// Create a new CouponRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CouponStore for CouponRepository {
    async fn find_by_code(&self, tenant_id: Uuid, code: &str) -> Result<Option<Coupon>, StoreError> {
        let coupon = sqlx::query_as::<_, Coupon>(
            r#"
            SELECT id, tenant_id, code, discount_type, discount_value, max_discount,
                   min_subtotal, usage_limit, used_count, is_active, starts_at, expires_at
            FROM coupons
            WHERE UPPER(code) = $2
            ORDER BY (tenant_id = $1) DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(code.trim().to_uppercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(coupon)
    }

    async fn increment_usage(&self, coupon_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET used_count = used_count + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(coupon_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
