//! Product persistence abstractions.
//!
//! The HTTP layer only ever talks to [`ProductStore`]; which implementation
//! backs it is decided at start-up.

use async_trait::async_trait;
use thiserror::Error;

use pricebook_products::{Product, ProductFields, ProductId};

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryProductStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresProductStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("corrupt stored record: {0}")]
    Corrupt(String),
}

/// Persistence collaborator for catalog records.
///
/// Each call is atomic for the single record it touches. Callers pass fields
/// that have already been validated.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// One page of records in ascending id order, plus the total count.
    async fn page(&self, request: PageRequest) -> Result<Page<Product>, StoreError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Store a new record; the store assigns the id and both timestamps.
    async fn insert(&self, fields: ProductFields) -> Result<Product, StoreError>;

    /// Overwrite every field of an existing record. `None` if `id` is unknown.
    async fn replace(&self, id: ProductId, fields: ProductFields)
        -> Result<Option<Product>, StoreError>;

    /// `false` if `id` is unknown.
    async fn delete(&self, id: ProductId) -> Result<bool, StoreError>;
}

/// Which page to read. Pages are 1-based.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    per_page: u64,
}

impl PageRequest {
    /// `page` and `per_page` are clamped to at least 1.
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Number of records before the first one on this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// A page of records plus what a client needs to navigate the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub current_page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            current_page: request.page(),
            per_page: request.per_page(),
        }
    }

    /// Last page number; 1 for an empty collection.
    pub fn last_page(&self) -> u64 {
        self.total.div_ceil(self.per_page).max(1)
    }

    /// 1-based position of the first item on this page.
    pub fn from(&self) -> Option<u64> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.offset() + 1)
        }
    }

    /// 1-based position of the last item on this page.
    pub fn to(&self) -> Option<u64> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.offset() + self.items.len() as u64)
        }
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            current_page: self.current_page,
            per_page: self.per_page,
        }
    }

    fn offset(&self) -> u64 {
        (self.current_page.max(1) - 1).saturating_mul(self.per_page)
    }
}
