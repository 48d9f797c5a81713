use crate::domain::model::{PackageQuery, PackageRecord, ShippingStatistic, StatisticKey};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Remote source of truth for package state.
#[async_trait]
pub trait PackageSource: Send + Sync {
    /// `Ok(None)` when the provider explicitly reports the number as unknown.
    async fn fetch(&self, tracking_number: &str) -> Result<Option<PackageRecord>>;
}

/// Remote source of current conditions at a location.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Current temperature in degrees Celsius.
    async fn current_temperature(&self, location: &str) -> Result<f64>;
}

#[async_trait]
pub trait PackageStore: Send + Sync {
    async fn get(&self, tracking_number: &str) -> Result<Option<PackageRecord>>;
    async fn insert(&self, record: &PackageRecord) -> Result<()>;
    async fn update(&self, record: &PackageRecord) -> Result<()>;
    async fn find(&self, query: &PackageQuery) -> Result<Vec<PackageRecord>>;
}

#[async_trait]
pub trait StatisticsStore: Send + Sync {
    async fn get(&self, key: &StatisticKey) -> Result<Option<ShippingStatistic>>;
    async fn insert(&self, statistic: &ShippingStatistic) -> Result<()>;
    async fn update(&self, statistic: &ShippingStatistic) -> Result<()>;
    /// All statistics for a route across carriers, ordered by carrier.
    async fn list_for_route(&self, origin: &str, destination: &str)
        -> Result<Vec<ShippingStatistic>>;
}

#[async_trait]
impl<T: PackageSource + ?Sized> PackageSource for Arc<T> {
    async fn fetch(&self, tracking_number: &str) -> Result<Option<PackageRecord>> {
        (**self).fetch(tracking_number).await
    }
}

#[async_trait]
impl<T: WeatherSource + ?Sized> WeatherSource for Arc<T> {
    async fn current_temperature(&self, location: &str) -> Result<f64> {
        (**self).current_temperature(location).await
    }
}

#[async_trait]
impl<T: PackageStore + ?Sized> PackageStore for Arc<T> {
    async fn get(&self, tracking_number: &str) -> Result<Option<PackageRecord>> {
        (**self).get(tracking_number).await
    }

    async fn insert(&self, record: &PackageRecord) -> Result<()> {
        (**self).insert(record).await
    }

    async fn update(&self, record: &PackageRecord) -> Result<()> {
        (**self).update(record).await
    }

    async fn find(&self, query: &PackageQuery) -> Result<Vec<PackageRecord>> {
        (**self).find(query).await
    }
}

#[async_trait]
impl<T: StatisticsStore + ?Sized> StatisticsStore for Arc<T> {
    async fn get(&self, key: &StatisticKey) -> Result<Option<ShippingStatistic>> {
        (**self).get(key).await
    }

    async fn insert(&self, statistic: &ShippingStatistic) -> Result<()> {
        (**self).insert(statistic).await
    }

    async fn update(&self, statistic: &ShippingStatistic) -> Result<()> {
        (**self).update(statistic).await
    }

    async fn list_for_route(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Vec<ShippingStatistic>> {
        (**self).list_for_route(origin, destination).await
    }
}
