use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::orders::ValidatedLine;

/// Raw ingredient tracked in stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub unit: String,
    pub stock_quantity: Decimal,
    pub low_stock_threshold: Decimal,
}

/// Quantity of one ingredient consumed by one serving of a menu item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecipeIngredient {
    pub menu_item_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity_per_serving: Decimal,
}

/// Ordered quantity of a menu item to destock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestockLine {
    pub menu_item_id: Uuid,
    pub quantity: u32,
}

impl From<&ValidatedLine> for DestockLine {
    fn from(line: &ValidatedLine) -> Self {
        Self {
            menu_item_id: line.menu_item_id,
            quantity: line.quantity,
        }
    }
}

/// Total quantity to take from one ingredient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDecrement {
    pub ingredient_id: Uuid,
    pub amount: Decimal,
}

/// Stock of one ingredient around a decrement
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StockLevel {
    pub ingredient_id: Uuid,
    pub name: String,
    pub unit: String,
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
    pub low_stock_threshold: Decimal,
}

impl StockLevel {
    /// True when this decrement took the stock from above its threshold to at or below it
    pub fn crossed_threshold(&self) -> bool {
        self.previous_stock > self.low_stock_threshold && self.new_stock <= self.low_stock_threshold
    }
}

/// Low-stock event raised for the admin surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub tenant_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: String,
    pub stock_quantity: Decimal,
    pub threshold: Decimal,
    pub order_id: Uuid,
}

impl LowStockAlert {
    pub fn new(tenant_id: Uuid, order_id: Uuid, level: &StockLevel) -> Self {
        Self {
            tenant_id,
            ingredient_id: level.ingredient_id,
            ingredient_name: level.name.clone(),
            unit: level.unit.clone(),
            stock_quantity: level.new_stock,
            threshold: level.low_stock_threshold,
            order_id,
        }
    }

    pub fn title(&self) -> String {
        format!("Stock bas : {}", self.ingredient_name)
    }

    pub fn message(&self) -> String {
        format!(
            "Il reste {} {} de {} (seuil d'alerte : {} {})",
            self.stock_quantity.normalize(),
            self.unit,
            self.ingredient_name,
            self.threshold.normalize(),
            self.unit
        )
    }
}
