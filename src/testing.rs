// In-memory collaborators for unit and pipeline tests

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::types::Json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::coupons::{Coupon, CouponStore};
use crate::error::StoreError;
use crate::inventory::{
    Ingredient, InventoryStore, LowStockAlert, NotificationChannel, RecipeIngredient, StockDecrement,
    StockLevel,
};
use crate::orders::{format_order_number, MenuItem, MenuStore, NewOrder, OrderCreated, OrderStore};
use crate::tenant::{SubscriptionPlan, SubscriptionStatus, Tenant, TenantStore};

fn injected() -> StoreError {
    StoreError::Other("injected failure".to_string())
}

/// Untaxed tenant row
pub fn tenant_row(slug: &str, plan: SubscriptionPlan, status: SubscriptionStatus) -> Tenant {
    Tenant {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        name: slug.to_string(),
        currency: "XOF".to_string(),
        enable_tax: false,
        tax_rate: Decimal::ZERO,
        enable_service_charge: false,
        service_charge_rate: Decimal::ZERO,
        subscription_plan: plan,
        subscription_status: status,
        trial_ends_at: None,
    }
}

/// Available menu item without variants or options
pub fn menu_item(tenant_id: Uuid, name: &str, price: i64) -> MenuItem {
    MenuItem {
        id: Uuid::new_v4(),
        tenant_id,
        name: name.to_string(),
        price,
        is_available: true,
        variants: Json(Vec::new()),
        options: Json(Vec::new()),
    }
}

#[derive(Default)]
pub struct InMemoryTenantStore {
    tenants: Mutex<HashMap<String, Tenant>>,
    lookups: AtomicUsize,
    failing: AtomicBool,
    conflicting: AtomicBool,
}

impl InMemoryTenantStore {
    pub fn insert(&self, tenant: Tenant) {
        self.tenants.lock().unwrap().insert(tenant.slug.clone(), tenant);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn conflict_all(&self) {
        self.conflicting.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.conflicting.load(Ordering::SeqCst) {
            return Err(StoreError::Conflict("could not serialize access".to_string()));
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected());
        }
        Ok(self.tenants.lock().unwrap().get(slug).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryMenuStore {
    items: Mutex<HashMap<Uuid, MenuItem>>,
    lookups: AtomicUsize,
}

impl InMemoryMenuStore {
    pub fn insert(&self, item: MenuItem) {
        self.items.lock().unwrap().insert(item.id, item);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MenuStore for InMemoryMenuStore {
    async fn find_items(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<Vec<MenuItem>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let items = self.items.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| items.get(id))
            .filter(|item| item.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    counters: Mutex<HashMap<(Uuid, NaiveDate), i32>>,
    orders: Mutex<Vec<NewOrder>>,
    failing: AtomicBool,
    conflicting: AtomicBool,
}

impl InMemoryOrderStore {
    pub fn orders(&self) -> Vec<NewOrder> {
        self.orders.lock().unwrap().clone()
    }

    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn conflict_all(&self) {
        self.conflicting.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_order_with_items(
        &self,
        order: &NewOrder,
        order_date: NaiveDate,
    ) -> Result<OrderCreated, StoreError> {
        if self.conflicting.load(Ordering::SeqCst) {
            return Err(StoreError::Conflict("could not serialize access".to_string()));
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected());
        }

        let sequence = {
            let mut counters = self.counters.lock().unwrap();
            let counter = counters.entry((order.tenant_id, order_date)).or_insert(0);
            *counter += 1;
            *counter
        };
        self.orders.lock().unwrap().push(order.clone());

        Ok(OrderCreated {
            order_id: Uuid::new_v4(),
            order_number: format_order_number(order_date, sequence),
            total: order.pricing.total,
        })
    }
}

#[derive(Default)]
pub struct InMemoryCouponStore {
    coupons: Mutex<Vec<Coupon>>,
    increments: Mutex<Vec<Uuid>>,
    lookups: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryCouponStore {
    pub fn insert(&self, coupon: Coupon) {
        self.coupons.lock().unwrap().push(coupon);
    }

    pub fn used_count(&self, coupon_id: Uuid) -> Option<i32> {
        self.coupons
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == coupon_id)
            .map(|c| c.used_count)
    }

    /// Every coupon id passed to `increment_usage`, failed calls included
    pub fn increment_calls(&self) -> Vec<Uuid> {
        self.increments.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CouponStore for InMemoryCouponStore {
    async fn find_by_code(&self, tenant_id: Uuid, code: &str) -> Result<Option<Coupon>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let wanted = code.trim().to_uppercase();
        let coupons = self.coupons.lock().unwrap();
        let mut matching = coupons.iter().filter(|c| c.code.to_uppercase() == wanted);
        let own = coupons
            .iter()
            .find(|c| c.code.to_uppercase() == wanted && c.tenant_id == tenant_id);
        Ok(own.or_else(|| matching.next()).cloned())
    }

    async fn increment_usage(&self, coupon_id: Uuid) -> Result<bool, StoreError> {
        self.increments.lock().unwrap().push(coupon_id);
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let mut coupons = self.coupons.lock().unwrap();
        match coupons.iter_mut().find(|c| c.id == coupon_id) {
            Some(coupon) => {
                coupon.used_count += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryInventoryStore {
    ingredients: Mutex<HashMap<Uuid, Ingredient>>,
    recipes: Mutex<Vec<RecipeIngredient>>,
    movements: Mutex<Vec<(Uuid, Uuid, Decimal)>>,
    recipe_calls: AtomicUsize,
    decrement_calls: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryInventoryStore {
    pub fn add_ingredient(&self, ingredient: Ingredient) {
        self.ingredients.lock().unwrap().insert(ingredient.id, ingredient);
    }

    pub fn add_recipe(&self, menu_item_id: Uuid, ingredient_id: Uuid, quantity_per_serving: Decimal) {
        self.recipes.lock().unwrap().push(RecipeIngredient {
            menu_item_id,
            ingredient_id,
            quantity_per_serving,
        });
    }

    pub fn stock_of(&self, ingredient_id: Uuid) -> Option<Decimal> {
        self.ingredients
            .lock()
            .unwrap()
            .get(&ingredient_id)
            .map(|i| i.stock_quantity)
    }

    /// `(ingredient_id, order_id, quantity_change)` rows written so far
    pub fn movements(&self) -> Vec<(Uuid, Uuid, Decimal)> {
        self.movements.lock().unwrap().clone()
    }

    pub fn recipe_calls(&self) -> usize {
        self.recipe_calls.load(Ordering::SeqCst)
    }

    pub fn decrement_calls(&self) -> usize {
        self.decrement_calls.load(Ordering::SeqCst)
    }

    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn recipes_for(
        &self,
        tenant_id: Uuid,
        menu_item_ids: &[Uuid],
    ) -> Result<Vec<RecipeIngredient>, StoreError> {
        self.recipe_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let ingredients = self.ingredients.lock().unwrap();
        Ok(self
            .recipes
            .lock()
            .unwrap()
            .iter()
            .filter(|r| menu_item_ids.contains(&r.menu_item_id))
            .filter(|r| {
                ingredients
                    .get(&r.ingredient_id)
                    .is_some_and(|i| i.tenant_id == tenant_id)
            })
            .cloned()
            .collect())
    }

    async fn decrement_stock(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        decrements: &[StockDecrement],
    ) -> Result<Vec<StockLevel>, StoreError> {
        self.decrement_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected());
        }

        let mut ingredients = self.ingredients.lock().unwrap();
        let mut movements = self.movements.lock().unwrap();
        let mut levels = Vec::new();

        for decrement in decrements {
            let Some(ingredient) = ingredients
                .get_mut(&decrement.ingredient_id)
                .filter(|i| i.tenant_id == tenant_id)
            else {
                continue;
            };

            let previous = ingredient.stock_quantity;
            ingredient.stock_quantity = (previous - decrement.amount).max(Decimal::ZERO);
            movements.push((ingredient.id, order_id, ingredient.stock_quantity - previous));

            levels.push(StockLevel {
                ingredient_id: ingredient.id,
                name: ingredient.name.clone(),
                unit: ingredient.unit.clone(),
                previous_stock: previous,
                new_stock: ingredient.stock_quantity,
                low_stock_threshold: ingredient.low_stock_threshold,
            });
        }

        Ok(levels)
    }
}

#[derive(Default)]
pub struct RecordingNotificationChannel {
    alerts: Mutex<Vec<LowStockAlert>>,
    failing: AtomicBool,
}

impl RecordingNotificationChannel {
    pub fn alerts(&self) -> Vec<LowStockAlert> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationChannel for RecordingNotificationChannel {
    async fn low_stock(&self, alert: &LowStockAlert) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}
