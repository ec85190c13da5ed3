//! Final-price calculation.
//!
//! Three percentage reductions are applied in a fixed order, each to the
//! already-reduced running price (they compound, they do not add up):
//!
//! 1. category discount: 5% when the category is exactly `"electronics"`
//! 2. special-customer discount: 10% when the [`CustomerDiscountPolicy`] says so
//! 3. the product's own `promotion_percentage`, when present and non-zero
//!
//! The result is rounded to 2 decimal places, midpoint away from zero.

use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::product::{Product, ProductFields};

/// The only category that earns the category discount (case-sensitive).
pub const DISCOUNTED_CATEGORY: &str = "electronics";

/// 0.05
pub const CATEGORY_DISCOUNT_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// 0.10
pub const SPECIAL_CUSTOMER_DISCOUNT_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

const DECIMAL_PLACES: u32 = 2;

/// Who the price is being computed for.
///
/// Anonymous (the default) unless the caller knows the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerContext {
    customer_ref: Option<String>,
}

impl CustomerContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_customer(customer_ref: impl Into<String>) -> Self {
        Self {
            customer_ref: Some(customer_ref.into()),
        }
    }

    pub fn customer_ref(&self) -> Option<&str> {
        self.customer_ref.as_deref()
    }
}

/// Decides whether a customer gets the special-customer discount.
pub trait CustomerDiscountPolicy: Send + Sync {
    fn is_special_customer(&self, ctx: &CustomerContext) -> bool;
}

impl<F> CustomerDiscountPolicy for F
where
    F: Fn(&CustomerContext) -> bool + Send + Sync,
{
    fn is_special_customer(&self, ctx: &CustomerContext) -> bool {
        self(ctx)
    }
}

/// Every customer is special. This is the production behaviour today.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysSpecial;

impl CustomerDiscountPolicy for AlwaysSpecial {
    fn is_special_customer(&self, _ctx: &CustomerContext) -> bool {
        true
    }
}

/// Computes `final_price` for catalog records.
#[derive(Clone)]
pub struct PromotionCalculator {
    policy: Arc<dyn CustomerDiscountPolicy>,
}

impl PromotionCalculator {
    pub fn new(policy: Arc<dyn CustomerDiscountPolicy>) -> Self {
        Self { policy }
    }

    pub fn final_price(&self, product: &Product, ctx: &CustomerContext) -> Decimal {
        self.final_price_of(product.fields(), ctx)
    }

    /// Same as [`Self::final_price`], for fields that are not stored yet.
    pub fn final_price_of(&self, fields: &ProductFields, ctx: &CustomerContext) -> Decimal {
        let price = fields.price;
        let price = apply_category_discount(&fields.category, price);
        let price = self.apply_customer_discount(ctx, price);
        let price = apply_promotion_percentage(fields.promotion_percentage, price);

        price.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
    }

    fn apply_customer_discount(&self, ctx: &CustomerContext, price: Decimal) -> Decimal {
        if self.policy.is_special_customer(ctx) {
            price - price * SPECIAL_CUSTOMER_DISCOUNT_RATE
        } else {
            price
        }
    }
}

impl Default for PromotionCalculator {
    fn default() -> Self {
        Self::new(Arc::new(AlwaysSpecial))
    }
}

impl core::fmt::Debug for PromotionCalculator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PromotionCalculator").finish_non_exhaustive()
    }
}

fn apply_category_discount(category: &str, price: Decimal) -> Decimal {
    if category == DISCOUNTED_CATEGORY {
        price - price * CATEGORY_DISCOUNT_RATE
    } else {
        price
    }
}

fn apply_promotion_percentage(promotion_percentage: Option<Decimal>, price: Decimal) -> Decimal {
    match promotion_percentage {
        Some(pct) if !pct.is_zero() => price - price * pct / Decimal::ONE_HUNDRED,
        _ => price,
    }
}
