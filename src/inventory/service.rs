use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::inventory::{
    DestockLine, InventoryStore, LowStockAlert, NotificationChannel, RecipeIngredient, StockDecrement,
};

/// Service for post-order stock accounting
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn InventoryStore>,
    notifier: Arc<dyn NotificationChannel>,
}

/// Sum recipe usage per ingredient, in ingredient id order
///
/// Lines for the same menu item and recipes sharing an ingredient collapse
/// into a single decrement.
pub fn plan_decrements(lines: &[DestockLine], recipes: &[RecipeIngredient]) -> Vec<StockDecrement> {
    let mut ordered: BTreeMap<Uuid, u64> = BTreeMap::new();
    for line in lines {
        *ordered.entry(line.menu_item_id).or_default() += u64::from(line.quantity);
    }

    let mut per_ingredient: BTreeMap<Uuid, Decimal> = BTreeMap::new();
    for recipe in recipes {
        if let Some(quantity) = ordered.get(&recipe.menu_item_id) {
            *per_ingredient.entry(recipe.ingredient_id).or_default() +=
                recipe.quantity_per_serving * Decimal::from(*quantity);
        }
    }

    per_ingredient
        .into_iter()
        .filter(|(_, amount)| *amount > Decimal::ZERO)
        .map(|(ingredient_id, amount)| StockDecrement { ingredient_id, amount })
        .collect()
}

impl InventoryService {
    /// Create a new InventoryService
    pub fn new(store: Arc<dyn InventoryStore>, notifier: Arc<dyn NotificationChannel>) -> Self {
        Self { store, notifier }
    }

    /// Decrement ingredient stock for a persisted order
    ///
    /// Returns the number of ingredients decremented. Low-stock alerts are
    /// raised for every ingredient that crossed its threshold; a failing alert
    /// is logged and does not fail the destock.
    pub async fn destock_order(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        lines: &[DestockLine],
    ) -> Result<usize, StoreError> {
        let mut menu_item_ids: Vec<Uuid> = lines.iter().map(|line| line.menu_item_id).collect();
        menu_item_ids.sort();
        menu_item_ids.dedup();

        let recipes = self.store.recipes_for(tenant_id, &menu_item_ids).await?;
        let decrements = plan_decrements(lines, &recipes);
        if decrements.is_empty() {
            tracing::debug!("Order {} uses no tracked ingredient", order_id);
            return Ok(0);
        }

        let levels = self.store.decrement_stock(tenant_id, order_id, &decrements).await?;
        tracing::debug!("Destocked {} ingredients for order {}", levels.len(), order_id);

        for level in levels.iter().filter(|level| level.crossed_threshold()) {
            let alert = LowStockAlert::new(tenant_id, order_id, level);
            if let Err(e) = self.notifier.low_stock(&alert).await {
                tracing::error!(
                    "Low-stock notification failed for tenant {} ingredient {}: {}",
                    tenant_id,
                    level.ingredient_id,
                    e
                );
            }
        }

        Ok(levels.len())
    }
}
