use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::inventory::{RecipeIngredient, StockDecrement, StockLevel};

/// Access to recipes and ingredient stock
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Recipe rows of the given menu items, scoped to the tenant
    async fn recipes_for(
        &self,
        tenant_id: Uuid,
        menu_item_ids: &[Uuid],
    ) -> Result<Vec<RecipeIngredient>, StoreError>;

    /// Apply every decrement and record its stock movement as one unit
    ///
    /// Each decrement is a single read-modify-write on the ingredient row and
    /// floors the stock at zero.
    async fn decrement_stock(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        decrements: &[StockDecrement],
    ) -> Result<Vec<StockLevel>, StoreError>;
}

/// Repository for inventory operations
#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    /// Create a new InventoryRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for InventoryRepository {
    async fn recipes_for(
        &self,
        tenant_id: Uuid,
        menu_item_ids: &[Uuid],
    ) -> Result<Vec<RecipeIngredient>, StoreError> {
        let recipes = sqlx::query_as::<_, RecipeIngredient>(
            r#"
            SELECT r.menu_item_id, r.ingredient_id, r.quantity_per_serving
            FROM recipe_ingredients r
            JOIN ingredients i ON i.id = r.ingredient_id
            WHERE r.menu_item_id = ANY($2) AND i.tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .bind(menu_item_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(recipes)
    }

    async fn decrement_stock(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        decrements: &[StockDecrement],
    ) -> Result<Vec<StockLevel>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut levels = Vec::with_capacity(decrements.len());

        for decrement in decrements {
            let level = sqlx::query_as::<_, StockLevel>(
                r#"
                WITH previous AS (
                    SELECT id, stock_quantity
                    FROM ingredients
                    WHERE id = $1 AND tenant_id = $2
                    FOR UPDATE
                )
                UPDATE ingredients i
                SET stock_quantity = GREATEST(i.stock_quantity - $3, 0), updated_at = NOW()
                FROM previous
                WHERE i.id = previous.id
                RETURNING i.id AS ingredient_id, i.name, i.unit,
                          previous.stock_quantity AS previous_stock,
                          i.stock_quantity AS new_stock,
                          i.low_stock_threshold
                "#,
            )
            .bind(decrement.ingredient_id)
            .bind(tenant_id)
            .bind(decrement.amount)
            .fetch_optional(&mut *tx)
            .await?;

            // Ingredient deleted since the recipe was read
            let Some(level) = level else {
                continue;
            };

            sqlx::query(
                r#"
                INSERT INTO stock_movements (tenant_id, ingredient_id, order_id, quantity_change, reason)
                VALUES ($1, $2, $3, $4, 'order')
                "#,
            )
            .bind(tenant_id)
            .bind(level.ingredient_id)
            .bind(order_id)
            .bind(level.new_stock - level.previous_stock)
            .execute(&mut *tx)
            .await?;

            levels.push(level);
        }

        tx.commit().await?;

        Ok(levels)
    }
}
