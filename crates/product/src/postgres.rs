//! PostgreSQL-backed stock ledger implementation.

use async_trait::async_trait;
use common::{CategoryId, ProductId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StockError};
use crate::ledger::StockLedger;
use crate::model::Product;
use crate::money::Money;

/// PostgreSQL-backed stock ledger.
///
/// The decrement is a single conditional `UPDATE ... WHERE stock >= $2`;
/// a zero-row result signals either an unknown product or insufficient
/// stock, disambiguated with a follow-up lookup.
#[derive(Clone)]
pub struct PostgresStockLedger {
    pool: PgPool,
}

impl PostgresStockLedger {
    /// Creates a new PostgreSQL stock ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get::<i64, _>("price_cents")?),
            stock: row.try_get::<i32, _>("stock")? as u32,
            category_id: CategoryId::from_uuid(row.try_get::<Uuid, _>("category_id")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, price_cents, stock, category_id, created_at, updated_at";

#[async_trait]
impl StockLedger for PostgresStockLedger {
    async fn get(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn reduce(&self, product_id: ProductId, quantity: u32) -> Result<Product> {
        if quantity == 0 {
            return Err(StockError::InvalidQuantity(quantity));
        }

        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product_id.as_uuid())
        .bind(quantity as i32)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                metrics::counter!("stock_reductions_total").increment(1);
                Self::row_to_product(row)
            }
            // Zero rows: the product is missing or the guard failed.
            None => {
                tracing::debug!(%product_id, quantity, "conditional decrement matched no rows");
                match self.get(product_id).await? {
                    Some(product) => Err(StockError::InsufficientStock {
                        name: product.name,
                        requested: quantity,
                        available: product.stock,
                    }),
                    None => Err(StockError::NotFound(product_id)),
                }
            }
        }
    }

    async fn increase(&self, product_id: ProductId, quantity: u32) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product_id.as_uuid())
        .bind(quantity as i32)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_product(row),
            None => Err(StockError::NotFound(product_id)),
        }
    }

    async fn insert(&self, product: Product) -> Result<Product> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_cents, stock, category_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.stock as i32)
        .bind(product.category_id.as_uuid())
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }
}
