//! Infrastructure layer: persistence for the product catalog.

pub mod store;

pub use store::{InMemoryProductStore, Page, PageRequest, ProductStore, StoreError};
#[cfg(feature = "postgres")]
pub use store::PostgresProductStore;
