use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use pricebook_core::RecordId;
use pricebook_products::{Product, ProductFields, ProductId};

use super::{Page, PageRequest, ProductStore, StoreError};

#[derive(Debug, Default)]
struct State {
    last_id: u64,
    rows: BTreeMap<ProductId, Product>,
}

/// In-memory product store for tests/dev.
///
/// Ids come from a counter that never reuses a value, even after deletes.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    inner: RwLock<State>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn page(&self, request: PageRequest) -> Result<Page<Product>, StoreError> {
        let state = self.inner.read().map_err(|_| StoreError::Poisoned)?;

        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let per_page = usize::try_from(request.per_page()).unwrap_or(usize::MAX);
        let items = state
            .rows
            .values()
            .skip(offset)
            .take(per_page)
            .cloned()
            .collect();

        Ok(Page::new(items, state.rows.len() as u64, request))
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let state = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.rows.get(&id).cloned())
    }

    async fn insert(&self, fields: ProductFields) -> Result<Product, StoreError> {
        let mut state = self.inner.write().map_err(|_| StoreError::Poisoned)?;

        state.last_id += 1;
        let id = ProductId::new(RecordId::new(state.last_id));
        let product = Product::new(id, fields, Utc::now());
        state.rows.insert(id, product.clone());

        tracing::debug!(product_id = %id, "product inserted");
        Ok(product)
    }

    async fn replace(
        &self,
        id: ProductId,
        fields: ProductFields,
    ) -> Result<Option<Product>, StoreError> {
        let mut state = self.inner.write().map_err(|_| StoreError::Poisoned)?;

        let Some(product) = state.rows.get_mut(&id) else {
            return Ok(None);
        };
        product.replace(fields, Utc::now());

        tracing::debug!(product_id = %id, "product replaced");
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        let mut state = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let removed = state.rows.remove(&id).is_some();
        if removed {
            tracing::debug!(product_id = %id, "product deleted");
        }
        Ok(removed)
    }
}
