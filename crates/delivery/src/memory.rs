//! In-memory delivery store implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{DeliveryId, OrderId};
use tokio::sync::RwLock;

use crate::model::Delivery;
use crate::status::DeliveryStatus;
use crate::store::{
    DeliveryFilter, DeliveryPage, DeliveryStats, DeliveryStore, PageInfo, PageRequest, StoreError,
};

/// In-memory delivery store for testing.
///
/// Provides the same interface and unique-constraint behavior as the
/// PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryDeliveryStore {
    deliveries: Arc<RwLock<HashMap<DeliveryId, Delivery>>>,
}

impl InMemoryDeliveryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of stored deliveries.
    pub async fn delivery_count(&self) -> usize {
        self.deliveries.read().await.len()
    }

    fn matches(filter: &DeliveryFilter, delivery: &Delivery) -> bool {
        if let Some(status) = filter.status
            && delivery.status != status
        {
            return false;
        }
        if let Some(ref needle) = filter.customer_name {
            let needle = needle.to_lowercase();
            let hit = delivery
                .customer_name
                .as_ref()
                .is_some_and(|name| name.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(from) = filter.created_from
            && delivery.created_at < from
        {
            return false;
        }
        if let Some(to) = filter.created_to
            && delivery.created_at > to
        {
            return false;
        }
        true
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn insert(&self, delivery: &Delivery) -> Result<(), StoreError> {
        let mut deliveries = self.deliveries.write().await;

        if deliveries
            .values()
            .any(|d| d.order_id == delivery.order_id)
        {
            return Err(StoreError::DuplicateOrder(delivery.order_id));
        }

        if let Some(ref tn) = delivery.tracking_number
            && deliveries
                .values()
                .any(|d| d.tracking_number.as_deref() == Some(tn))
        {
            return Err(StoreError::DuplicateTracking(tn.clone()));
        }

        deliveries.insert(delivery.id, delivery.clone());
        Ok(())
    }

    async fn update(&self, delivery: &Delivery) -> Result<(), StoreError> {
        let mut deliveries = self.deliveries.write().await;

        if !deliveries.contains_key(&delivery.id) {
            return Err(StoreError::NotFound(delivery.id));
        }

        if let Some(ref tn) = delivery.tracking_number
            && deliveries
                .values()
                .any(|d| d.id != delivery.id && d.tracking_number.as_deref() == Some(tn))
        {
            return Err(StoreError::DuplicateTracking(tn.clone()));
        }

        deliveries.insert(delivery.id, delivery.clone());
        Ok(())
    }

    async fn get(&self, id: DeliveryId) -> Result<Option<Delivery>, StoreError> {
        Ok(self.deliveries.read().await.get(&id).cloned())
    }

    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Delivery>, StoreError> {
        Ok(self
            .deliveries
            .read()
            .await
            .values()
            .find(|d| d.order_id == order_id)
            .cloned())
    }

    async fn get_by_tracking(
        &self,
        tracking_number: &str,
    ) -> Result<Option<Delivery>, StoreError> {
        Ok(self
            .deliveries
            .read()
            .await
            .values()
            .find(|d| d.tracking_number.as_deref() == Some(tracking_number))
            .cloned())
    }

    async fn list(
        &self,
        filter: &DeliveryFilter,
        page: PageRequest,
    ) -> Result<DeliveryPage, StoreError> {
        let deliveries = self.deliveries.read().await;

        let mut matching: Vec<Delivery> = deliveries
            .values()
            .filter(|d| Self::matches(filter, d))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total_items = matching.len() as u64;
        let deliveries: Vec<Delivery> = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();

        Ok(DeliveryPage {
            deliveries,
            pagination: PageInfo::calculate(page, total_items),
        })
    }

    async fn stats(&self) -> Result<DeliveryStats, StoreError> {
        let deliveries = self.deliveries.read().await;

        let mut stats = DeliveryStats::default();
        for delivery in deliveries.values() {
            stats.total += 1;
            match delivery.status {
                DeliveryStatus::Pending => stats.pending += 1,
                DeliveryStatus::Delivered => stats.completed += 1,
                DeliveryStatus::Failed | DeliveryStatus::Returned => stats.failed += 1,
                _ => stats.in_progress += 1,
            }
        }
        Ok(stats)
    }
}
