//! Field constraints and the wording of their failure messages.
//!
//! Both the typed validation in [`crate::product`] and the request parsing in
//! the HTTP layer report failures through these helpers, so a given rule always
//! produces the same message.

use rust_decimal::Decimal;

use pricebook_core::ValidationErrors;

pub const TITLE: &str = "title";
pub const DESCRIPTION: &str = "description";
pub const PRICE: &str = "price";
pub const CATEGORY: &str = "category";
pub const PROMOTION_PERCENTAGE: &str = "promotion_percentage";

/// Maximum title length, in characters.
pub const TITLE_MAX_CHARS: usize = 255;

/// Upper bound for `price`: 9999999999.99 (fits `NUMERIC(12, 2)`).
pub const PRICE_MAX: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Upper bound for `promotion_percentage`.
pub const PROMOTION_MAX: Decimal = Decimal::ONE_HUNDRED;

/// Scale prices and percentages are stored at.
pub const STORED_SCALE: u32 = 2;

/// Human label for an attribute: `promotion_percentage` -> `promotion percentage`.
pub fn label(field: &str) -> String {
    field.replace('_', " ")
}

pub fn required(field: &str) -> String {
    format!("The {} field is required.", label(field))
}

pub fn must_be_string(field: &str) -> String {
    format!("The {} field must be a string.", label(field))
}

pub fn must_be_number(field: &str) -> String {
    format!("The {} field must be a number.", label(field))
}

pub fn at_least(field: &str, min: impl core::fmt::Display) -> String {
    format!("The {} field must be at least {min}.", label(field))
}

pub fn not_greater_than(field: &str, max: impl core::fmt::Display) -> String {
    format!("The {} field must not be greater than {max}.", label(field))
}

pub fn too_long(field: &str, max_chars: usize) -> String {
    format!(
        "The {} field must not be greater than {max_chars} characters.",
        label(field)
    )
}

pub fn check_title(title: &str, errors: &mut ValidationErrors) {
    if title.trim().is_empty() {
        errors.add(TITLE, required(TITLE));
    } else if title.chars().count() > TITLE_MAX_CHARS {
        errors.add(TITLE, too_long(TITLE, TITLE_MAX_CHARS));
    }
}

pub fn check_description(description: &str, errors: &mut ValidationErrors) {
    if description.trim().is_empty() {
        errors.add(DESCRIPTION, required(DESCRIPTION));
    }
}

pub fn check_price(price: Decimal, errors: &mut ValidationErrors) {
    if price < Decimal::ZERO {
        errors.add(PRICE, at_least(PRICE, 0));
    } else if price > PRICE_MAX {
        errors.add(PRICE, not_greater_than(PRICE, PRICE_MAX));
    }
}

pub fn check_category(category: &str, errors: &mut ValidationErrors) {
    if category.trim().is_empty() {
        errors.add(CATEGORY, required(CATEGORY));
    }
}

pub fn check_promotion_percentage(pct: Option<Decimal>, errors: &mut ValidationErrors) {
    let Some(pct) = pct else {
        return;
    };
    if pct < Decimal::ZERO {
        errors.add(PROMOTION_PERCENTAGE, at_least(PROMOTION_PERCENTAGE, 0));
    } else if pct > PROMOTION_MAX {
        errors.add(PROMOTION_PERCENTAGE, not_greater_than(PROMOTION_PERCENTAGE, PROMOTION_MAX));
    }
}
