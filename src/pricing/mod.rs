// Pricing engine
// Pure functions turning a server-trusted subtotal into a price breakdown

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::tenant::TenantFiscalConfig;

/// Price breakdown of one order, in minor currency units
///
/// `total = subtotal + tax_amount + service_charge_amount - discount_amount`,
/// and `total >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingBreakdown {
    pub subtotal: i64,
    pub tax_amount: i64,
    pub service_charge_amount: i64,
    pub discount_amount: i64,
    pub total: i64,
}

/// Calculate the total of one line
pub fn calculate_line_total(unit_price: i64, quantity: u32) -> i64 {
    unit_price.saturating_mul(i64::from(quantity))
}

/// Calculate the subtotal of an order from its line totals
pub fn calculate_subtotal(line_totals: &[i64]) -> i64 {
    line_totals.iter().fold(0i64, |acc, line| acc.saturating_add(*line))
}

fn clamp_rate(rate: Decimal) -> Decimal {
    rate.max(Decimal::ZERO).min(Decimal::ONE)
}

/// `round(amount * rate)` to the nearest minor unit, halves away from zero
fn apply_rate(amount: i64, rate: Decimal) -> i64 {
    (Decimal::from(amount) * clamp_rate(rate))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(amount)
}

/// Calculate the price breakdown of an order
///
/// Tax and service charge are both computed on the pre-discount subtotal and
/// rounded independently. The discount is clamped to the subtotal so the total
/// never goes negative.
pub fn calculate_order_total(
    subtotal: i64,
    fiscal: &TenantFiscalConfig,
    discount_amount: i64,
) -> PricingBreakdown {
    let subtotal = subtotal.max(0);

    let tax_amount = if fiscal.enable_tax {
        apply_rate(subtotal, fiscal.tax_rate)
    } else {
        0
    };

    let service_charge_amount = if fiscal.enable_service_charge {
        apply_rate(subtotal, fiscal.service_charge_rate)
    } else {
        0
    };

    let discount_amount = discount_amount.clamp(0, subtotal);

    PricingBreakdown {
        subtotal,
        tax_amount,
        service_charge_amount,
        discount_amount,
        total: subtotal
            .saturating_add(tax_amount)
            .saturating_add(service_charge_amount)
            .saturating_sub(discount_amount),
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn rate() -> impl Strategy<Value = Decimal> {
        (0u32..=100).prop_map(|percent| Decimal::from(percent) / Decimal::from(100))
    }

    fn fiscal_config() -> impl Strategy<Value = TenantFiscalConfig> {
        (any::<bool>(), rate(), any::<bool>(), rate()).prop_map(
            |(enable_tax, tax_rate, enable_service_charge, service_charge_rate)| TenantFiscalConfig {
                currency: "XOF".to_string(),
                enable_tax,
                tax_rate,
                enable_service_charge,
                service_charge_rate,
            },
        )
    }

    /// Without tax or service charge the total is the subtotal minus the discount
    #[test]
    fn prop_untaxed_total_is_subtotal_minus_discount() {
        proptest!(|(subtotal in 0i64..=10_000_000, discount in 0i64..=10_000_000)| {
            let breakdown = calculate_order_total(subtotal, &TenantFiscalConfig::untaxed("XOF"), discount);
            prop_assert!(breakdown.discount_amount <= subtotal);
            prop_assert_eq!(breakdown.total, subtotal - breakdown.discount_amount);
        });
    }

    /// A discount larger than the subtotal zeroes the untaxed total
    #[test]
    fn prop_oversized_discount_zeroes_total() {
        proptest!(|(subtotal in 0i64..=10_000_000, extra in 1i64..=10_000_000)| {
            let breakdown = calculate_order_total(subtotal, &TenantFiscalConfig::untaxed("XOF"), subtotal + extra);
            prop_assert_eq!(breakdown.discount_amount, subtotal);
            prop_assert_eq!(breakdown.total, 0);
        });
    }

    /// Every component is non-negative and the total follows the formula
    #[test]
    fn prop_breakdown_formula_holds() {
        proptest!(|(
            subtotal in 0i64..=10_000_000,
            discount in -1_000i64..=20_000_000,
            fiscal in fiscal_config()
        )| {
            let b = calculate_order_total(subtotal, &fiscal, discount);
            prop_assert!(b.tax_amount >= 0);
            prop_assert!(b.service_charge_amount >= 0);
            prop_assert!(b.discount_amount >= 0);
            prop_assert!(b.total >= 0);
            prop_assert_eq!(b.total, b.subtotal + b.tax_amount + b.service_charge_amount - b.discount_amount);
        });
    }

    /// Same inputs, same output
    #[test]
    fn prop_pricing_is_deterministic() {
        proptest!(|(subtotal in 0i64..=10_000_000, discount in 0i64..=10_000_000, fiscal in fiscal_config())| {
            let first = calculate_order_total(subtotal, &fiscal, discount);
            let second = calculate_order_total(subtotal, &fiscal, discount);
            prop_assert_eq!(first, second);
            prop_assert_eq!(
                serde_json::to_vec(&first).unwrap(),
                serde_json::to_vec(&second).unwrap()
            );
        });
    }
}
