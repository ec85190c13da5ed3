//! Products domain module.
//!
//! This crate contains the catalog record and its pricing rules, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod pricing;
pub mod product;
pub mod rules;

pub use pricing::{AlwaysSpecial, CustomerContext, CustomerDiscountPolicy, PromotionCalculator};
pub use product::{Product, ProductFields, ProductId};
