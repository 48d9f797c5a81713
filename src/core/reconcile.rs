use crate::domain::model::PackageRecord;
use crate::domain::ports::PackageStore;
use crate::utils::error::Result;

/// Merges fetched package state into the local store. The fetched copy always
/// wins: an existing record is replaced field by field, never diffed.
pub struct Reconciler<P: PackageStore> {
    store: P,
}

impl<P: PackageStore> Reconciler<P> {
    pub fn new(store: P) -> Self {
        Self { store }
    }

    /// Inserts an unseen package or overwrites the stored one. Store failures
    /// are returned so the fetch is not reported as successful.
    pub async fn reconcile(&self, fresh: PackageRecord) -> Result<PackageRecord> {
        match self.store.get(&fresh.tracking_number).await? {
            None => {
                self.store.insert(&fresh).await?;
                tracing::info!("📦 Stored new package {}", fresh.tracking_number);
                Ok(fresh)
            }
            Some(mut existing) => {
                existing.overwrite_from(&fresh);
                self.store.update(&existing).await?;
                tracing::debug!(
                    "Updated package {} (status: {})",
                    existing.tracking_number,
                    existing.status
                );
                Ok(existing)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryStore;
    use crate::utils::error::TrackerError;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn fetched() -> PackageRecord {
        let shipped = Utc.with_ymd_and_hms(2024, 12, 20, 14, 0, 0).unwrap();
        PackageRecord {
            tracking_number: "1Z999AA10123456784".to_string(),
            carrier: "UPS".to_string(),
            status: "Completed".to_string(),
            shipping_date: shipped,
            delivery_date: Some(shipped + Duration::days(3)),
            origin: "NYC".to_string(),
            destination: "LA".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unseen_key_is_inserted_verbatim() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = Reconciler::new(store.clone());

        let stored = reconciler.reconcile(fetched()).await.unwrap();

        assert_eq!(stored, fetched());
        let loaded = store.get(&stored.tracking_number).await.unwrap().unwrap();
        assert_eq!(loaded, fetched());
        assert_eq!(store.package_write_count(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = Reconciler::new(store.clone());

        reconciler.reconcile(fetched()).await.unwrap();
        let second = reconciler.reconcile(fetched()).await.unwrap();

        assert_eq!(second, fetched());
        assert_eq!(store.package_count().await, 1);
        assert_eq!(
            store.get(&second.tracking_number).await.unwrap().unwrap(),
            fetched()
        );
    }

    #[tokio::test]
    async fn test_seen_key_is_fully_replaced() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = Reconciler::new(store.clone());
        reconciler.reconcile(fetched()).await.unwrap();

        let mut newer = fetched();
        newer.carrier = "FedEx".to_string();
        newer.status = "In Transit".to_string();
        newer.shipping_date = newer.shipping_date + Duration::days(1);
        newer.delivery_date = None;
        newer.origin = "Boston".to_string();
        newer.destination = "Seattle".to_string();

        let stored = reconciler.reconcile(newer.clone()).await.unwrap();

        assert_eq!(stored, newer);
        let loaded = store.get(&newer.tracking_number).await.unwrap().unwrap();
        assert_eq!(loaded, newer);
        assert!(loaded.delivery_date.is_none());
        assert_eq!(store.package_count().await, 1);
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_package_writes(true);
        let reconciler = Reconciler::new(store.clone());

        let err = reconciler.reconcile(fetched()).await.unwrap_err();

        assert!(matches!(err, TrackerError::Persistence { .. }));
        assert_eq!(store.package_count().await, 0);
    }
}
