//! PostgreSQL-backed delivery store implementation.

use async_trait::async_trait;
use common::{DeliveryId, OrderId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::model::{Delivery, LineItem};
use crate::status::DeliveryStatus;
use crate::store::{
    DeliveryFilter, DeliveryPage, DeliveryStats, DeliveryStore, PageInfo, PageRequest, StoreError,
};

/// PostgreSQL-backed delivery store.
///
/// The `order_id` and `tracking_number` unique constraints live in the
/// schema; violations are translated into the typed store errors.
#[derive(Clone)]
pub struct PostgresDeliveryStore {
    pool: PgPool,
}

const DELIVERY_COLUMNS: &str = "id, order_id, status, delivery_address, customer_name, \
     customer_phone, tracking_number, estimated_delivery, actual_delivery, notes, order_items, \
     created_at, updated_at";

impl PostgresDeliveryStore {
    /// Creates a new PostgreSQL delivery store.
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

    fn row_to_delivery(row: PgRow) -> Result<Delivery, StoreError> {
        let status_str: String = row.try_get("status")?;
        let status: DeliveryStatus = status_str.parse().map_err(|e: String| {
            StoreError::Serialization(serde_json::Error::io(std::io::Error::other(e)))
        })?;

        let items_json: serde_json::Value = row.try_get("order_items")?;
        let items: Vec<LineItem> = serde_json::from_value(items_json)?;

        Ok(Delivery {
            id: DeliveryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            status,
            delivery_address: row.try_get("delivery_address")?,
            customer_name: row.try_get("customer_name")?,
            customer_phone: row.try_get("customer_phone")?,
            tracking_number: row.try_get("tracking_number")?,
            estimated_delivery: row.try_get("estimated_delivery")?,
            actual_delivery: row.try_get("actual_delivery")?,
            notes: row.try_get("notes")?,
            items,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn map_unique_violation(delivery: &Delivery, e: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e {
            match db_err.constraint() {
                Some("deliveries_order_id_key") => {
                    return StoreError::DuplicateOrder(delivery.order_id);
                }
                Some("deliveries_tracking_number_key") => {
                    return StoreError::DuplicateTracking(
                        delivery.tracking_number.clone().unwrap_or_default(),
                    );
                }
                _ => {}
            }
        }
        StoreError::Database(e)
    }

    fn filter_clauses(filter: &DeliveryFilter) -> (String, u32) {
        let mut sql = String::new();
        let mut param_count = 0;

        if filter.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if filter.customer_name.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND customer_name ILIKE ${param_count}"));
        }
        if filter.created_from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at >= ${param_count}"));
        }
        if filter.created_to.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at <= ${param_count}"));
        }

        (sql, param_count)
    }

}

#[async_trait]
impl DeliveryStore for PostgresDeliveryStore {
    async fn insert(&self, delivery: &Delivery) -> Result<(), StoreError> {
        let items_json = serde_json::to_value(&delivery.items)?;

        sqlx::query(
            r#"
            INSERT INTO deliveries (id, order_id, status, delivery_address, customer_name,
                customer_phone, tracking_number, estimated_delivery, actual_delivery, notes,
                order_items, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(delivery.id.as_uuid())
        .bind(delivery.order_id.as_uuid())
        .bind(delivery.status.as_str())
        .bind(&delivery.delivery_address)
        .bind(&delivery.customer_name)
        .bind(&delivery.customer_phone)
        .bind(&delivery.tracking_number)
        .bind(delivery.estimated_delivery)
        .bind(delivery.actual_delivery)
        .bind(&delivery.notes)
        .bind(items_json)
        .bind(delivery.created_at)
        .bind(delivery.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_unique_violation(delivery, e))?;

        Ok(())
    }

    async fn update(&self, delivery: &Delivery) -> Result<(), StoreError> {
        let items_json = serde_json::to_value(&delivery.items)?;

        let result = sqlx::query(
            r#"
            UPDATE deliveries
            SET status = $2, delivery_address = $3, customer_name = $4, customer_phone = $5,
                tracking_number = $6, estimated_delivery = $7, actual_delivery = $8, notes = $9,
                order_items = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(delivery.id.as_uuid())
        .bind(delivery.status.as_str())
        .bind(&delivery.delivery_address)
        .bind(&delivery.customer_name)
        .bind(&delivery.customer_phone)
        .bind(&delivery.tracking_number)
        .bind(delivery.estimated_delivery)
        .bind(delivery.actual_delivery)
        .bind(&delivery.notes)
        .bind(items_json)
        .bind(delivery.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_unique_violation(delivery, e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(delivery.id));
        }
        Ok(())
    }

    async fn get(&self, id: DeliveryId) -> Result<Option<Delivery>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_delivery).transpose()
    }

    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Delivery>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE order_id = $1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_delivery).transpose()
    }

    async fn get_by_tracking(
        &self,
        tracking_number: &str,
    ) -> Result<Option<Delivery>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE tracking_number = $1"
        ))
        .bind(tracking_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_delivery).transpose()
    }

    async fn list(
        &self,
        filter: &DeliveryFilter,
        page: PageRequest,
    ) -> Result<DeliveryPage, StoreError> {
        let (clauses, param_count) = Self::filter_clauses(filter);
        let pattern = filter.customer_name.as_ref().map(|n| format!("%{n}%"));

        let count_sql = format!("SELECT COUNT(*) FROM deliveries WHERE 1=1{clauses}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(status) = filter.status {
            count_query = count_query.bind(status.as_str());
        }
        if let Some(ref pattern) = pattern {
            count_query = count_query.bind(pattern);
        }
        if let Some(from) = filter.created_from {
            count_query = count_query.bind(from);
        }
        if let Some(to) = filter.created_to {
            count_query = count_query.bind(to);
        }
        let total_items = count_query.fetch_one(&self.pool).await?;

        let list_sql = format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE 1=1{clauses} \
             ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2
        );
        // Same binding order as the count query, then limit/offset.
        let mut list_query = sqlx::query(&list_sql);
        if let Some(status) = filter.status {
            list_query = list_query.bind(status.as_str());
        }
        if let Some(ref pattern) = pattern {
            list_query = list_query.bind(pattern);
        }
        if let Some(from) = filter.created_from {
            list_query = list_query.bind(from);
        }
        if let Some(to) = filter.created_to {
            list_query = list_query.bind(to);
        }
        let list_query = list_query
            .bind(page.limit as i64)
            .bind(page.offset() as i64);

        let rows = list_query.fetch_all(&self.pool).await?;
        let deliveries: Vec<Delivery> = rows
            .into_iter()
            .map(Self::row_to_delivery)
            .collect::<Result<_, _>>()?;

        Ok(DeliveryPage {
            deliveries,
            pagination: PageInfo::calculate(page, total_items as u64),
        })
    }

    async fn stats(&self) -> Result<DeliveryStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status IN
                    ('confirmed', 'packed', 'shipped', 'in_transit', 'out_for_delivery'))
                    AS in_progress,
                COUNT(*) FILTER (WHERE status = 'delivered') AS completed,
                COUNT(*) FILTER (WHERE status IN ('failed', 'returned')) AS failed
            FROM deliveries
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DeliveryStats {
            total: row.try_get::<i64, _>("total")? as u64,
            pending: row.try_get::<i64, _>("pending")? as u64,
            in_progress: row.try_get::<i64, _>("in_progress")? as u64,
            completed: row.try_get::<i64, _>("completed")? as u64,
            failed: row.try_get::<i64, _>("failed")? as u64,
        })
    }
}
