// Post-commit side effects of a placed order
//
// Destocking and coupon usage run on their own tasks once the order is
// durable. Their failures are logged and never reach the caller.

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::coupons::CouponService;
use crate::inventory::{DestockLine, InventoryService};
use crate::orders::{OrderCreated, ValidatedLine};

#[derive(Clone)]
pub struct OrderSideEffects {
    inventory: InventoryService,
    coupons: CouponService,
}

impl OrderSideEffects {
    pub fn new(inventory: InventoryService, coupons: CouponService) -> Self {
        Self { inventory, coupons }
    }

    /// Spawn the side effects of `created`, independently of each other
    ///
    /// The returned handles may be dropped; the tasks keep running detached.
    pub fn dispatch(
        &self,
        tenant_id: Uuid,
        created: &OrderCreated,
        lines: &[ValidatedLine],
        coupon_id: Option<Uuid>,
    ) -> Vec<JoinHandle<()>> {
        let order_id = created.order_id;
        let mut handles = Vec::with_capacity(2);

        let inventory = self.inventory.clone();
        let destock_lines: Vec<DestockLine> = lines.iter().map(DestockLine::from).collect();
        handles.push(tokio::spawn(async move {
            match inventory.destock_order(tenant_id, order_id, &destock_lines).await {
                Ok(count) => {
                    tracing::debug!("Order {} destocked {} ingredients", order_id, count)
                }
                Err(e) => tracing::error!(
                    "Destock failed for tenant {} order {}: {}",
                    tenant_id,
                    order_id,
                    e
                ),
            }
        }));

        if let Some(coupon_id) = coupon_id {
            let coupons = self.coupons.clone();
            handles.push(tokio::spawn(async move {
                if let Err(e) = coupons.increment_usage(coupon_id).await {
                    tracing::error!(
                        "Coupon usage increment failed for tenant {} order {} coupon {}: {}",
                        tenant_id,
                        order_id,
                        coupon_id,
                        e
                    );
                }
            }));
        }

        handles
    }
}
