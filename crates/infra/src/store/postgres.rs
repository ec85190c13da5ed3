//! Postgres-backed product store.
//!
//! One `products` table (see `migrations/0001_create_products.sql`); every
//! operation is a single statement, so record-level atomicity comes from
//! Postgres itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use pricebook_core::RecordId;
use pricebook_products::{Product, ProductFields, ProductId};

use super::{Page, PageRequest, ProductStore, StoreError};

const CREATE_PRODUCTS_TABLE: &str = include_str!("../../migrations/0001_create_products.sql");

const PRODUCT_COLUMNS: &str =
    "id, title, description, price, category, promotion_percentage, created_at, updated_at";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub struct PostgresProductStore {
    pool: PgPool,
}

impl PostgresProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a small pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the `products` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_PRODUCTS_TABLE).execute(&self.pool).await?;
        tracing::info!("products schema ready");
        Ok(())
    }
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    async fn page(&self, request: PageRequest) -> Result<Page<Product>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(to_db_int(request.per_page()))
        .bind(to_db_int(request.offset()))
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(product_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total.max(0) as u64, request))
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let Some(db_id) = db_id(id) else {
            return Ok(None);
        };

        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(db_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn insert(&self, fields: ProductFields) -> Result<Product, StoreError> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO products (title, description, price, category, promotion_percentage, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(&fields.category)
        .bind(fields.promotion_percentage)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let product = product_from_row(&row)?;
        tracing::debug!(product_id = %product.id(), "product inserted");
        Ok(product)
    }

    async fn replace(
        &self,
        id: ProductId,
        fields: ProductFields,
    ) -> Result<Option<Product>, StoreError> {
        let Some(db_id) = db_id(id) else {
            return Ok(None);
        };

        let row = sqlx::query(&format!(
            "UPDATE products \
             SET title = $1, description = $2, price = $3, category = $4, \
                 promotion_percentage = $5, updated_at = $6 \
             WHERE id = $7 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(&fields.category)
        .bind(fields.promotion_percentage)
        .bind(Utc::now())
        .bind(db_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        let Some(db_id) = db_id(id) else {
            return Ok(false);
        };

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(db_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Ids above `i64::MAX` cannot exist in a `BIGSERIAL` column.
fn db_id(id: ProductId) -> Option<i64> {
    i64::try_from(id.0.get()).ok()
}

fn to_db_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let id: i64 = row.try_get("id")?;
    let id = u64::try_from(id)
        .map_err(|_| StoreError::Corrupt(format!("negative product id {id}")))?;

    let fields = ProductFields {
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price: row.try_get::<Decimal, _>("price")?,
        category: row.try_get("category")?,
        promotion_percentage: row.try_get::<Option<Decimal>, _>("promotion_percentage")?,
    };
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Product::restore(
        ProductId::new(RecordId::new(id)),
        fields,
        created_at,
        updated_at,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_outside_bigserial_range_have_no_row() {
        assert_eq!(db_id(ProductId::new(RecordId::new(42))), Some(42));
        assert_eq!(db_id(ProductId::new(RecordId::new(u64::MAX))), None);
    }

    #[test]
    fn pagination_bounds_saturate() {
        assert_eq!(to_db_int(10), 10);
        assert_eq!(to_db_int(u64::MAX), i64::MAX);
    }

    #[test]
    fn schema_creates_products_table() {
        assert!(CREATE_PRODUCTS_TABLE.contains("CREATE TABLE IF NOT EXISTS products"));
    }
}
