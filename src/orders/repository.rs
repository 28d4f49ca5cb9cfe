use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::orders::{format_order_number, MenuItem, NewOrder, OrderCreated, OrderStatus};

/// Read access to the live menu
#[async_trait]
pub trait MenuStore: Send + Sync {
    /// Menu items of `tenant_id` among `ids`; foreign or deleted ids are simply absent
    async fn find_items(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<Vec<MenuItem>, StoreError>;
}

/// Durable order persistence
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist the order header and every line as one unit, numbering the order
    /// for `order_date`
    async fn create_order_with_items(
        &self,
        order: &NewOrder,
        order_date: NaiveDate,
    ) -> Result<OrderCreated, StoreError>;
}

/// Repository for menu item reads
#[derive(Clone)]
pub struct MenuRepository {
    pool: PgPool,
}

impl MenuRepository {
    /// Create a new MenuRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MenuStore for MenuRepository {
    async fn find_items(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<Vec<MenuItem>, StoreError> {
        let items = sqlx::query_as::<_, MenuItem>(
            r#"
            SELECT id, tenant_id, name, price, is_available, variants, options
            FROM menu_items
            WHERE tenant_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(tenant_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

/// Repository for order operations
#[derive(Clone)]
pub struct OrdersRepository {
    pool: PgPool,
}

impl OrdersRepository {
    /// Create a new OrdersRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for OrdersRepository {
    async fn create_order_with_items(
        &self,
        order: &NewOrder,
        order_date: NaiveDate,
    ) -> Result<OrderCreated, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Atomic increment-and-read of the per (tenant, day) counter
        let sequence: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO order_counters (tenant_id, order_date, last_value)
            VALUES ($1, $2, 1)
            ON CONFLICT (tenant_id, order_date)
            DO UPDATE SET last_value = order_counters.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(order.tenant_id)
        .bind(order_date)
        .fetch_one(&mut *tx)
        .await?;

        let created = sqlx::query_as::<_, OrderCreated>(
            r#"
            INSERT INTO orders (
                tenant_id, order_number, status, service_type, table_number, customer_name,
                notes, subtotal, tax_amount, service_charge_amount, discount_amount, total, coupon_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id AS order_id, order_number, total
            "#,
        )
        .bind(order.tenant_id)
        .bind(format_order_number(order_date, sequence))
        .bind(OrderStatus::Pending)
        .bind(order.service_type)
        .bind(&order.table_number)
        .bind(&order.customer_name)
        .bind(&order.notes)
        .bind(order.pricing.subtotal)
        .bind(order.pricing.tax_amount)
        .bind(order.pricing.service_charge_amount)
        .bind(order.pricing.discount_amount)
        .bind(order.pricing.total)
        .bind(order.coupon_id)
        .fetch_one(&mut *tx)
        .await?;

        for line in &order.lines {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    order_id, menu_item_id, name, quantity, unit_price, line_total,
                    selected_variant, selected_option
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(created.order_id)
            .bind(line.menu_item_id)
            .bind(&line.name)
            .bind(line.quantity as i32)
            .bind(line.unit_price)
            .bind(line.line_total)
            .bind(&line.selected_variant)
            .bind(&line.selected_option)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(created)
    }
}
