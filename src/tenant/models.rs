use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use crate::error::ServiceError;

pub const TENANT_NOT_FOUND_MESSAGE: &str = "Restaurant introuvable";
pub const TENANT_CLOSED_MESSAGE: &str = "Ce restaurant n'accepte pas de commandes pour le moment";

/// Subscription plan of a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Free,
    Starter,
    Pro,
    Business,
}

/// Pricing features unlocked by a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanFeatures {
    pub coupons: bool,
    pub service_charge: bool,
}

impl SubscriptionPlan {
    pub fn features(self) -> PlanFeatures {
        match self {
            SubscriptionPlan::Free => PlanFeatures {
                coupons: false,
                service_charge: false,
            },
            SubscriptionPlan::Starter => PlanFeatures {
                coupons: false,
                service_charge: true,
            },
            SubscriptionPlan::Pro | SubscriptionPlan::Business => PlanFeatures {
                coupons: true,
                service_charge: true,
            },
        }
    }
}

impl fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Starter => "starter",
            SubscriptionPlan::Pro => "pro",
            SubscriptionPlan::Business => "business",
        };
        f.write_str(s)
    }
}

/// Subscription lifecycle, maintained by the billing webhook flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Canceled,
    Suspended,
}

/// Tenant row as stored
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub currency: String,
    pub enable_tax: bool,
    pub tax_rate: Decimal,
    pub enable_service_charge: bool,
    pub service_charge_rate: Decimal,
    pub subscription_plan: SubscriptionPlan,
    pub subscription_status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
}

/// Per-tenant fiscal settings consumed by the pricing engine
///
/// Rates are fractions in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantFiscalConfig {
    pub currency: String,
    pub enable_tax: bool,
    pub tax_rate: Decimal,
    pub enable_service_charge: bool,
    pub service_charge_rate: Decimal,
}

impl TenantFiscalConfig {
    /// Config with neither tax nor service charge
    pub fn untaxed(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            enable_tax: false,
            tax_rate: Decimal::ZERO,
            enable_service_charge: false,
            service_charge_rate: Decimal::ZERO,
        }
    }
}

/// Minimal tenant identity handed to every later stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub plan: SubscriptionPlan,
    pub features: PlanFeatures,
    /// Fiscal config with plan gating already applied
    pub fiscal: TenantFiscalConfig,
}

impl Tenant {
    /// Check the tenant may take orders at `now`
    ///
    /// Suspended tenants are hidden as if absent; tenants whose subscription
    /// lapsed are visible but closed.
    pub fn check_eligibility(&self, now: DateTime<Utc>) -> Result<(), ServiceError> {
        match self.subscription_status {
            SubscriptionStatus::Suspended => Err(ServiceError::not_found(TENANT_NOT_FOUND_MESSAGE)),
            SubscriptionStatus::Canceled => Err(ServiceError::forbidden(TENANT_CLOSED_MESSAGE)),
            SubscriptionStatus::Trialing => match self.trial_ends_at {
                Some(ends_at) if ends_at <= now => Err(ServiceError::forbidden(TENANT_CLOSED_MESSAGE)),
                _ => Ok(()),
            },
            SubscriptionStatus::Active | SubscriptionStatus::PastDue => Ok(()),
        }
    }

    /// Fiscal config after plan gating
    pub fn effective_fiscal_config(&self) -> TenantFiscalConfig {
        let features = self.subscription_plan.features();
        TenantFiscalConfig {
            currency: self.currency.clone(),
            enable_tax: self.enable_tax,
            tax_rate: self.tax_rate,
            enable_service_charge: self.enable_service_charge && features.service_charge,
            service_charge_rate: self.service_charge_rate,
        }
    }

    pub fn into_context(self) -> TenantContext {
        let fiscal = self.effective_fiscal_config();
        TenantContext {
            id: self.id,
            features: self.subscription_plan.features(),
            plan: self.subscription_plan,
            slug: self.slug,
            name: self.name,
            fiscal,
        }
    }
}
