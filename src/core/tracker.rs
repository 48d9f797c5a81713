use crate::core::reconcile::Reconciler;
use crate::core::stats_cache::{AggregateCache, StatisticsPolicy};
use crate::domain::model::{
    ArrivalEstimate, AverageShippingTime, PackageDetails, PackageRecord, ShippingStatistic,
};
use crate::domain::ports::{PackageSource, PackageStore, StatisticsStore, WeatherSource};
use crate::utils::error::{Result, TrackerError};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const WEATHER_DELAY_WARNING: &str = "Weather conditions at the destination may cause delays.";

/// Temperature band outside of which a delay warning is shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherRule {
    pub cold_below_c: f64,
    pub hot_above_c: f64,
}

impl Default for WeatherRule {
    fn default() -> Self {
        Self {
            cold_below_c: 10.0,
            hot_above_c: 20.0,
        }
    }
}

impl WeatherRule {
    pub fn warning_for(&self, temperature_c: f64) -> Option<String> {
        if temperature_c < self.cold_below_c || temperature_c > self.hot_above_c {
            Some(WEATHER_DELAY_WARNING.to_string())
        } else {
            None
        }
    }
}

/// A locally stored package with its best-effort weather warning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredPackage {
    pub package: PackageRecord,
    pub weather_warning: Option<String>,
}

pub struct TrackingOrchestrator<Src, W, P, S>
where
    Src: PackageSource,
    W: WeatherSource,
    P: PackageStore + Clone,
    S: StatisticsStore + Clone,
{
    source: Src,
    weather: W,
    rule: WeatherRule,
    packages: P,
    statistics: S,
    reconciler: Reconciler<P>,
    cache: AggregateCache<P, S>,
}

impl<Src, W, P, S> TrackingOrchestrator<Src, W, P, S>
where
    Src: PackageSource,
    W: WeatherSource,
    P: PackageStore + Clone,
    S: StatisticsStore + Clone,
{
    pub fn new(
        source: Src,
        weather: W,
        packages: P,
        statistics: S,
        policy: StatisticsPolicy,
        rule: WeatherRule,
    ) -> Self {
        Self {
            source,
            weather,
            rule,
            reconciler: Reconciler::new(packages.clone()),
            cache: AggregateCache::new(packages.clone(), statistics.clone(), policy),
            packages,
            statistics,
        }
    }

    pub async fn track_package(&self, tracking_number: &str) -> Result<PackageDetails> {
        self.track_package_at(tracking_number, Utc::now()).await
    }

    /// Fetches, stores and enriches a package as of `now`.
    ///
    /// A failed fetch and an unknown number both come back as
    /// [`TrackerError::NotFound`]. A failure to store the fetched package is
    /// returned as is. Weather and statistics never fail the call.
    pub async fn track_package_at(
        &self,
        tracking_number: &str,
        now: DateTime<Utc>,
    ) -> Result<PackageDetails> {
        tracing::info!("🔍 Tracking package {}", tracking_number);

        let fetched = match self.source.fetch(tracking_number).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::info!("Package source has no record of {}", tracking_number);
                return Err(TrackerError::not_found(tracking_number));
            }
            Err(e) => {
                tracing::warn!("⚠️ Package fetch for {} failed: {}", tracking_number, e);
                return Err(TrackerError::not_found(tracking_number));
            }
        };

        let package = self.reconciler.reconcile(fetched).await?;
        let key = package.statistic_key();

        let (weather_warning, average) = tokio::join!(
            self.weather_warning(&package.destination),
            self.cache.average_shipping_time(&key, now)
        );
        let average = average.unwrap_or_else(|e| {
            tracing::warn!("⚠️ Shipping statistics for {} unavailable: {}", key, e);
            AverageShippingTime::no_data()
        });

        let estimate = ArrivalEstimate::project(package.shipping_date, average.average_days, now);
        tracing::info!(
            "✅ Tracked {} ({}, {} historical samples)",
            package.tracking_number,
            package.status,
            average.sample_count
        );

        Ok(PackageDetails {
            package,
            weather_warning,
            average_shipping_days: average.average_days,
            sample_count: average.sample_count,
            estimate,
        })
    }

    /// Reads a package from the local store only.
    pub async fn stored_details(&self, tracking_number: &str) -> Result<StoredPackage> {
        let package = self
            .packages
            .get(tracking_number)
            .await?
            .ok_or_else(|| TrackerError::not_found(tracking_number))?;
        let weather_warning = self.weather_warning(&package.destination).await;
        Ok(StoredPackage {
            package,
            weather_warning,
        })
    }

    /// Cached statistics for a route across all carriers.
    pub async fn route_statistics(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Vec<ShippingStatistic>> {
        let mut statistics = self.statistics.list_for_route(origin, destination).await?;
        statistics.retain(|s| s.shipment_count > 0);
        Ok(statistics)
    }

    async fn weather_warning(&self, destination: &str) -> Option<String> {
        match self.weather.current_temperature(destination).await {
            Ok(temperature) => {
                tracing::debug!("Current temperature at {}: {:.1}°C", destination, temperature);
                self.rule.warning_for(temperature)
            }
            Err(e) => {
                tracing::warn!("⚠️ Weather lookup for {} failed: {}", destination, e);
                None
            }
        }
    }
}
