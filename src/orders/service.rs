use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ServiceError};
use crate::orders::{
    items_rejected, ItemRejection, MenuItem, MenuStore, NewOrder, OrderCreated, OrderIntake,
    OrderLineIntake, OrderStore, ValidatedItems, ValidatedLine,
};
use crate::pricing::{calculate_line_total, calculate_subtotal, PricingBreakdown};
use crate::tenant::{TenantContext, TenantSlug, TenantStore, TENANT_NOT_FOUND_MESSAGE};

/// Service for order business logic
#[derive(Clone)]
pub struct OrderService {
    tenants: Arc<dyn TenantStore>,
    menu: Arc<dyn MenuStore>,
    orders: Arc<dyn OrderStore>,
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Re-price one cart line from its live menu item
///
/// A selected variant replaces the base price, a selected option adds its delta.
fn price_line(line: &OrderLineIntake, item: &MenuItem) -> Result<ValidatedLine, ItemRejection> {
    if !item.is_available {
        return Err(ItemRejection::Unavailable {
            name: item.name.clone(),
        });
    }

    let (base_price, selected_variant) = match &line.selected_variant {
        Some(wanted) => {
            let variant = item
                .variants
                .iter()
                .find(|v| same_name(&v.name, wanted))
                .ok_or_else(|| ItemRejection::UnknownVariant {
                    name: item.name.clone(),
                    variant: wanted.clone(),
                })?;
            (variant.price, Some(variant.name.clone()))
        }
        None => (item.price, None),
    };

    let (delta, selected_option) = match &line.selected_option {
        Some(wanted) => {
            let option = item
                .options
                .iter()
                .find(|o| same_name(&o.name, wanted))
                .ok_or_else(|| ItemRejection::UnknownOption {
                    name: item.name.clone(),
                    option: wanted.clone(),
                })?;
            (option.price_delta, Some(option.name.clone()))
        }
        None => (0, None),
    };

    let unit_price = base_price.saturating_add(delta).max(0);

    Ok(ValidatedLine {
        menu_item_id: item.id,
        name: item.name.clone(),
        quantity: line.quantity,
        unit_price,
        line_total: calculate_line_total(unit_price, line.quantity),
        selected_variant,
        selected_option,
    })
}

impl OrderService {
    /// Create a new OrderService
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        menu: Arc<dyn MenuStore>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            tenants,
            menu,
            orders,
        }
    }

    /// Load the tenant behind a slug and check it may take orders
    pub async fn validate_tenant(&self, slug: &TenantSlug) -> Result<TenantContext, ApiError> {
        let tenant = self
            .tenants
            .find_by_slug(slug.as_str())
            .await?
            .ok_or_else(|| ServiceError::not_found(TENANT_NOT_FOUND_MESSAGE))?;

        tenant.check_eligibility(Utc::now())?;

        Ok(tenant.into_context())
    }

    /// Re-validate every cart line against the live menu of `tenant_id`
    ///
    /// Prices come from the store, never from the client. Every failing line
    /// is reported, in cart order, in a single validation error.
    pub async fn validate_order_items(
        &self,
        tenant_id: Uuid,
        lines: &[OrderLineIntake],
    ) -> Result<ValidatedItems, ApiError> {
        let mut ids: Vec<Uuid> = lines.iter().map(|line| line.menu_item_id).collect();
        ids.sort();
        ids.dedup();

        let menu: HashMap<Uuid, MenuItem> = self
            .menu
            .find_items(tenant_id, &ids)
            .await?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        let mut validated = Vec::with_capacity(lines.len());
        let mut rejections = Vec::new();

        for line in lines {
            let priced = match menu.get(&line.menu_item_id) {
                Some(item) => price_line(line, item),
                None => Err(ItemRejection::NotFound {
                    name: line.name.clone(),
                }),
            };

            match priced {
                Ok(validated_line) => {
                    if (line.client_unit_price - validated_line.unit_price as f64).abs() >= 1.0 {
                        tracing::debug!(
                            "Client price {} for item {} differs from menu price {}",
                            line.client_unit_price,
                            validated_line.menu_item_id,
                            validated_line.unit_price
                        );
                    }
                    validated.push(validated_line);
                }
                Err(rejection) => rejections.push(rejection),
            }
        }

        if !rejections.is_empty() {
            return Err(items_rejected(&rejections).into());
        }

        let line_totals: Vec<i64> = validated.iter().map(|line| line.line_total).collect();
        Ok(ValidatedItems {
            validated_total: calculate_subtotal(&line_totals),
            lines: validated,
        })
    }

    /// Persist the order and its lines as one unit
    ///
    /// Any store failure here is fatal and internal, write conflicts included.
    pub async fn create_order_with_items(
        &self,
        tenant: &TenantContext,
        intake: &OrderIntake,
        items: &ValidatedItems,
        pricing: PricingBreakdown,
        coupon_id: Option<Uuid>,
    ) -> Result<OrderCreated, ApiError> {
        let new_order = NewOrder {
            tenant_id: tenant.id,
            service_type: intake.service_type,
            table_number: intake.table_number.clone(),
            customer_name: intake.customer_name.clone(),
            notes: intake.notes.clone(),
            coupon_id,
            pricing,
            lines: items.lines.clone(),
        };

        let created = self
            .orders
            .create_order_with_items(&new_order, Utc::now().date_naive())
            .await
            .map_err(ApiError::Store)?;

        tracing::info!(
            "Order {} ({}) created for tenant {} with total {}",
            created.order_number,
            created.order_id,
            tenant.slug,
            created.total
        );

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, StoreError};
    use axum::response::IntoResponse;
    use crate::orders::{MenuOption, MenuVariant};
    use crate::testing::{
        menu_item, tenant_row, InMemoryMenuStore, InMemoryOrderStore, InMemoryTenantStore,
    };
    use crate::tenant::{SubscriptionPlan, SubscriptionStatus, TENANT_CLOSED_MESSAGE};

    struct Fixture {
        tenants: Arc<InMemoryTenantStore>,
        menu: Arc<InMemoryMenuStore>,
        orders: Arc<InMemoryOrderStore>,
        service: OrderService,
    }

    fn fixture() -> Fixture {
        let tenants = Arc::new(InMemoryTenantStore::default());
        let menu = Arc::new(InMemoryMenuStore::default());
        let orders = Arc::new(InMemoryOrderStore::default());
        let service = OrderService::new(tenants.clone(), menu.clone(), orders.clone());
        Fixture {
            tenants,
            menu,
            orders,
            service,
        }
    }

    fn line(id: Uuid, name: &str, quantity: u32) -> OrderLineIntake {
        OrderLineIntake {
            menu_item_id: id,
            name: name.to_string(),
            client_unit_price: 1.0,
            quantity,
            category_name: None,
            selected_option: None,
            selected_variant: None,
        }
    }

    fn service_error(err: ApiError) -> ServiceError {
        match err {
            ApiError::Service(err) => err,
            other => panic!("expected a service error, got {:?}", other),
        }
    }

    fn slug(value: &str) -> TenantSlug {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-tenant-slug", value.parse().unwrap());
        crate::tenant::resolve_tenant(&headers, "x-tenant-slug").unwrap()
    }

    #[tokio::test]
    async fn test_validate_tenant() {
        let f = fixture();
        let row = tenant_row("chez-awa", SubscriptionPlan::Pro, SubscriptionStatus::Active);
        let id = row.id;
        f.tenants.insert(row);

        let ctx = f.service.validate_tenant(&slug("chez-awa")).await.unwrap();
        assert_eq!(ctx.id, id);
        assert!(ctx.features.coupons);
    }

    #[tokio::test]
    async fn test_unknown_or_suspended_tenant_is_not_found() {
        let f = fixture();
        f.tenants.insert(tenant_row("ferme", SubscriptionPlan::Pro, SubscriptionStatus::Suspended));

        for s in ["inconnu", "ferme"] {
            let err = service_error(f.service.validate_tenant(&slug(s)).await.unwrap_err());
            assert_eq!(err.kind, ErrorKind::NotFound);
            assert_eq!(err.message, TENANT_NOT_FOUND_MESSAGE);
        }
    }

    #[tokio::test]
    async fn test_canceled_tenant_is_forbidden() {
        let f = fixture();
        f.tenants.insert(tenant_row("parti", SubscriptionPlan::Pro, SubscriptionStatus::Canceled));

        let err = service_error(f.service.validate_tenant(&slug("parti")).await.unwrap_err());
        assert_eq!(err.kind, ErrorKind::Forbidden);
        assert_eq!(err.message, TENANT_CLOSED_MESSAGE);
    }

    #[tokio::test]
    async fn test_items_repriced_from_menu() {
        let f = fixture();
        let tenant = Uuid::new_v4();
        let thieb = menu_item(tenant, "Thieboudienne", 3500);
        let bissap = menu_item(tenant, "Bissap", 500);
        let (thieb_id, bissap_id) = (thieb.id, bissap.id);
        f.menu.insert(thieb);
        f.menu.insert(bissap);

        let items = f
            .service
            .validate_order_items(tenant, &[line(thieb_id, "Thieb", 2), line(bissap_id, "Bissap", 3)])
            .await
            .unwrap();

        assert_eq!(items.validated_total, 8500);
        assert_eq!(items.lines[0].name, "Thieboudienne");
        assert_eq!(items.lines[0].unit_price, 3500);
        assert_eq!(items.lines[1].line_total, 1500);
    }

    #[tokio::test]
    async fn test_variant_and_option_pricing() {
        let f = fixture();
        let tenant = Uuid::new_v4();
        let mut yassa = menu_item(tenant, "Yassa", 3000);
        yassa.variants.0.push(MenuVariant {
            name: "Grande".to_string(),
            price: 4000,
        });
        yassa.options.0.push(MenuOption {
            name: "Supplément oignons".to_string(),
            price_delta: 250,
        });
        let id = yassa.id;
        f.menu.insert(yassa);

        let mut wanted = line(id, "Yassa", 2);
        wanted.selected_variant = Some("grande".to_string());
        wanted.selected_option = Some("Supplément oignons".to_string());

        let items = f.service.validate_order_items(tenant, &[wanted]).await.unwrap();
        assert_eq!(items.lines[0].unit_price, 4250);
        assert_eq!(items.lines[0].selected_variant.as_deref(), Some("Grande"));
        assert_eq!(items.validated_total, 8500);
    }

    #[tokio::test]
    async fn test_all_rejected_lines_reported() {
        let f = fixture();
        let tenant = Uuid::new_v4();
        let mut off = menu_item(tenant, "Mafé", 3000);
        off.is_available = false;
        let off_id = off.id;
        let ok = menu_item(tenant, "Bissap", 500);
        let ok_id = ok.id;
        f.menu.insert(off);
        f.menu.insert(ok);

        let mut bad_variant = line(ok_id, "Bissap", 1);
        bad_variant.selected_variant = Some("XXL".to_string());

        let err = f
            .service
            .validate_order_items(
                tenant,
                &[
                    line(Uuid::new_v4(), "Ghost Item", 1),
                    line(ok_id, "Bissap", 1),
                    line(off_id, "Mafé", 1),
                    bad_variant,
                ],
            )
            .await
            .unwrap_err();

        let err = service_error(err);
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(
            err.details.unwrap(),
            vec![
                "Article \"Ghost Item\" non trouvé".to_string(),
                "Article \"Mafé\" indisponible".to_string(),
                "Variante \"XXL\" inconnue pour l'article \"Bissap\"".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_foreign_tenant_item_not_found() {
        let f = fixture();
        let item = menu_item(Uuid::new_v4(), "Yassa", 3000);
        let id = item.id;
        f.menu.insert(item);

        let err = service_error(
            f.service
                .validate_order_items(Uuid::new_v4(), &[line(id, "Yassa", 1)])
                .await
                .unwrap_err(),
        );
        assert_eq!(err.details.unwrap(), vec!["Article \"Yassa\" non trouvé".to_string()]);
    }

    #[tokio::test]
    async fn test_create_order_numbers_per_day() {
        let f = fixture();
        let row = tenant_row("chez-awa", SubscriptionPlan::Pro, SubscriptionStatus::Active);
        let ctx = row.into_context();
        let intake = OrderIntake {
            lines: vec![],
            table_number: Some("4".to_string()),
            customer_name: None,
            service_type: Default::default(),
            coupon_code: None,
            notes: None,
        };
        let items = ValidatedItems {
            lines: vec![],
            validated_total: 1000,
        };
        let pricing = crate::pricing::calculate_order_total(1000, &ctx.fiscal, 0);

        let first = f
            .service
            .create_order_with_items(&ctx, &intake, &items, pricing, None)
            .await
            .unwrap();
        let second = f
            .service
            .create_order_with_items(&ctx, &intake, &items, pricing, None)
            .await
            .unwrap();

        assert!(first.order_number.ends_with("-0001"));
        assert!(second.order_number.ends_with("-0002"));
        assert_eq!(first.total, pricing.total);
        assert_eq!(f.orders.orders().len(), 2);
        assert_eq!(f.orders.orders()[0].table_number.as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn test_persistence_failure_is_internal() {
        let f = fixture();
        f.orders.fail_all();
        let err = create_empty_order(&f).await;
        assert!(matches!(err, ApiError::Store(_)));
    }

    #[tokio::test]
    async fn test_persistence_conflict_is_internal() {
        let f = fixture();
        f.orders.conflict_all();
        let err = create_empty_order(&f).await;

        assert!(matches!(err, ApiError::Store(StoreError::Conflict(_))));
        assert_eq!(
            err.into_response().status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    async fn create_empty_order(f: &Fixture) -> ApiError {
        let ctx = tenant_row("chez-awa", SubscriptionPlan::Free, SubscriptionStatus::Active).into_context();
        let intake = OrderIntake {
            lines: vec![],
            table_number: None,
            customer_name: None,
            service_type: Default::default(),
            coupon_code: None,
            notes: None,
        };
        let items = ValidatedItems {
            lines: vec![],
            validated_total: 0,
        };
        let pricing = crate::pricing::calculate_order_total(0, &ctx.fiscal, 0);

        f.service
            .create_order_with_items(&ctx, &intake, &items, pricing, None)
            .await
            .unwrap_err()
    }
}
