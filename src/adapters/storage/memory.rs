use crate::domain::model::{PackageQuery, PackageRecord, ShippingStatistic, StatisticKey};
use crate::domain::ports::{PackageStore, StatisticsStore};
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Non-durable store backing both ports. Counts history scans and can be told
/// to fail writes. Inserts overwrite, matching the SQLite upsert.
#[derive(Debug, Default)]
pub struct MemoryStore {
    packages: Mutex<HashMap<String, PackageRecord>>,
    statistics: Mutex<BTreeMap<StatisticKey, ShippingStatistic>>,
    scans: AtomicUsize,
    package_writes: AtomicUsize,
    fail_package_writes: AtomicBool,
    fail_statistic_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `find` calls served so far.
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    /// Number of successful package inserts and updates.
    pub fn package_write_count(&self) -> usize {
        self.package_writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_package_writes(&self, fail: bool) {
        self.fail_package_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_statistic_writes(&self, fail: bool) {
        self.fail_statistic_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn package_count(&self) -> usize {
        self.packages.lock().await.len()
    }

    pub async fn statistic_count(&self) -> usize {
        self.statistics.lock().await.len()
    }

    fn check_package_write(&self) -> Result<()> {
        if self.fail_package_writes.load(Ordering::SeqCst) {
            return Err(TrackerError::persistence("package store is read-only"));
        }
        Ok(())
    }

    fn check_statistic_write(&self) -> Result<()> {
        if self.fail_statistic_writes.load(Ordering::SeqCst) {
            return Err(TrackerError::persistence("statistics store is read-only"));
        }
        Ok(())
    }
}

#[async_trait]
impl PackageStore for MemoryStore {
    async fn get(&self, tracking_number: &str) -> Result<Option<PackageRecord>> {
        Ok(self.packages.lock().await.get(tracking_number).cloned())
    }

    async fn insert(&self, record: &PackageRecord) -> Result<()> {
        self.check_package_write()?;
        self.packages
            .lock()
            .await
            .insert(record.tracking_number.clone(), record.clone());
        self.package_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update(&self, record: &PackageRecord) -> Result<()> {
        self.check_package_write()?;
        let mut packages = self.packages.lock().await;
        match packages.get_mut(&record.tracking_number) {
            Some(existing) => {
                *existing = record.clone();
                self.package_writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(TrackerError::persistence(format!(
                "no package {} to update",
                record.tracking_number
            ))),
        }
    }

    async fn find(&self, query: &PackageQuery) -> Result<Vec<PackageRecord>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let packages = self.packages.lock().await;
        Ok(packages
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StatisticsStore for MemoryStore {
    async fn get(&self, key: &StatisticKey) -> Result<Option<ShippingStatistic>> {
        Ok(self.statistics.lock().await.get(key).cloned())
    }

    async fn insert(&self, statistic: &ShippingStatistic) -> Result<()> {
        self.check_statistic_write()?;
        self.statistics
            .lock()
            .await
            .insert(statistic.key.clone(), statistic.clone());
        Ok(())
    }

    async fn update(&self, statistic: &ShippingStatistic) -> Result<()> {
        self.check_statistic_write()?;
        let mut statistics = self.statistics.lock().await;
        match statistics.get_mut(&statistic.key) {
            Some(existing) => {
                *existing = statistic.clone();
                Ok(())
            }
            None => Err(TrackerError::persistence(format!(
                "no statistic {} to update",
                statistic.key
            ))),
        }
    }

    async fn list_for_route(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Vec<ShippingStatistic>> {
        let statistics = self.statistics.lock().await;
        Ok(statistics
            .values()
            .filter(|s| s.key.origin == origin && s.key.destination == destination)
            .cloned()
            .collect())
    }
}
