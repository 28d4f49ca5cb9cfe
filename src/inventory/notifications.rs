// Low-stock notification side channel

use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::inventory::LowStockAlert;

/// Fire-and-forget sink for low-stock events
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn low_stock(&self, alert: &LowStockAlert) -> Result<(), StoreError>;
}

/// Writes alerts to the `notifications` table read by the admin surface
#[derive(Clone)]
pub struct PgNotificationChannel {
    pool: PgPool,
}

impl PgNotificationChannel {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationChannel for PgNotificationChannel {
    async fn low_stock(&self, alert: &LowStockAlert) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (tenant_id, kind, title, message, payload)
            VALUES ($1, 'low_stock', $2, $3, $4)
            "#,
        )
        .bind(alert.tenant_id)
        .bind(alert.title())
        .bind(alert.message())
        .bind(json!({
            "ingredient_id": alert.ingredient_id,
            "order_id": alert.order_id,
            "stock_quantity": alert.stock_quantity,
            "threshold": alert.threshold,
        }))
        .execute(&self.pool)
        .await?;

        tracing::warn!(
            "Low stock for tenant {}: {} at {} {}",
            alert.tenant_id,
            alert.ingredient_name,
            alert.stock_quantity,
            alert.unit
        );
        Ok(())
    }
}
