//! Service layer: store access plus `final_price` attachment.

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use pricebook_core::{DomainError, ValidationErrors};
use pricebook_infra::{InMemoryProductStore, Page, PageRequest, ProductStore, StoreError};
use pricebook_products::{CustomerContext, Product, ProductFields, ProductId, PromotionCalculator};

use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found")]
    NotFound,

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(errors) => ServiceError::Validation(errors),
            DomainError::InvalidId(_) | DomainError::NotFound => ServiceError::NotFound,
        }
    }
}

/// A stored product together with the price computed for the current customer.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedProduct {
    pub product: Product,
    pub final_price: Decimal,
}

pub struct AppServices {
    store: Arc<dyn ProductStore>,
    calculator: PromotionCalculator,
}

impl AppServices {
    pub fn new(store: Arc<dyn ProductStore>, calculator: PromotionCalculator) -> Self {
        Self { store, calculator }
    }

    fn priced(&self, product: Product, customer: &CustomerContext) -> PricedProduct {
        let final_price = self.calculator.final_price(&product, customer);
        PricedProduct {
            product,
            final_price,
        }
    }

    pub async fn list_products(
        &self,
        request: PageRequest,
        customer: &CustomerContext,
    ) -> Result<Page<PricedProduct>, ServiceError> {
        let page = self.store.page(request).await?;
        Ok(page.map(|p| self.priced(p, customer)))
    }

    pub async fn get_product(
        &self,
        id: ProductId,
        customer: &CustomerContext,
    ) -> Result<PricedProduct, ServiceError> {
        let product = self.store.get(id).await?.ok_or(ServiceError::NotFound)?;
        Ok(self.priced(product, customer))
    }

    pub async fn create_product(
        &self,
        fields: ProductFields,
        customer: &CustomerContext,
    ) -> Result<PricedProduct, ServiceError> {
        let fields = fields.into_valid()?;
        let product = self.store.insert(fields).await?;
        tracing::info!(product_id = %product.id(), "product created");
        Ok(self.priced(product, customer))
    }

    /// Full replace. Fields are validated before the record is looked up.
    pub async fn update_product(
        &self,
        id: ProductId,
        fields: ProductFields,
        customer: &CustomerContext,
    ) -> Result<PricedProduct, ServiceError> {
        let fields = fields.into_valid()?;
        let product = self
            .store
            .replace(id, fields)
            .await?
            .ok_or(ServiceError::NotFound)?;
        tracing::info!(product_id = %product.id(), "product updated");
        Ok(self.priced(product, customer))
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<(), ServiceError> {
        if !self.store.delete(id).await? {
            return Err(ServiceError::NotFound);
        }
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}

/// Wire the product store selected by `config` behind the default calculator.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    if config.use_persistent_stores {
        #[cfg(feature = "postgres")]
        {
            return build_persistent_services(config).await;
        }
        #[cfg(not(feature = "postgres"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but postgres feature not enabled, falling back to in-memory"
            );
        }
    }

    Ok(build_in_memory_services())
}

pub fn build_in_memory_services() -> AppServices {
    AppServices::new(
        Arc::new(InMemoryProductStore::new()),
        PromotionCalculator::default(),
    )
}

#[cfg(feature = "postgres")]
async fn build_persistent_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    use anyhow::Context;
    use pricebook_infra::PostgresProductStore;

    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;

    let store = PostgresProductStore::connect(database_url, config.database_max_connections)
        .await
        .context("failed to connect to postgres")?;
    store
        .ensure_schema()
        .await
        .context("failed to create products schema")?;

    tracing::info!("using postgres product store");
    Ok(AppServices::new(Arc::new(store), PromotionCalculator::default()))
}
