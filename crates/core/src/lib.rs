//! `pricebook-core` — shared building blocks for the catalog crates.
//!
//! This crate contains **pure** primitives (no infrastructure concerns):
//! identifiers and the domain error model.

pub mod error;
pub mod id;
pub mod validation;

pub use error::{DomainError, DomainResult};
pub use id::{RecordId, RequestId};
pub use validation::ValidationErrors;
