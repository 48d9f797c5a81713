use crate::domain::model::{
    AverageShippingTime, PackageQuery, PackageRecord, ShippingStatistic, StatisticKey,
    STATUS_COMPLETED,
};
use crate::domain::ports::{PackageStore, StatisticsStore};
use crate::utils::error::Result;
use chrono::{DateTime, Duration, Utc};

/// The two windows governing the statistics cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsPolicy {
    /// Maximum age of a stored statistic before it is recomputed.
    pub freshness: Duration,
    /// How far back shipping dates reach when recomputing.
    pub history: Duration,
}

impl Default for StatisticsPolicy {
    fn default() -> Self {
        Self {
            freshness: Duration::days(3),
            history: Duration::days(60),
        }
    }
}

/// Averages the shipping time over `records`. Every record counts toward the
/// sample size; only records with a delivery date on or after the shipping
/// date add days to the total, so incomplete data pulls the average down.
pub fn summarize(records: &[PackageRecord]) -> AverageShippingTime {
    if records.is_empty() {
        return AverageShippingTime::no_data();
    }
    let total_days: f64 = records.iter().filter_map(PackageRecord::shipping_days).sum();
    let sample_count = records.len() as u32;
    AverageShippingTime {
        average_days: Some(total_days / sample_count as f64),
        sample_count,
    }
}

/// Serves average shipping times from the statistics store while they are
/// fresh and recomputes them from package history once they go stale.
pub struct AggregateCache<P: PackageStore, S: StatisticsStore> {
    packages: P,
    statistics: S,
    policy: StatisticsPolicy,
}

impl<P: PackageStore, S: StatisticsStore> AggregateCache<P, S> {
    pub fn new(packages: P, statistics: S, policy: StatisticsPolicy) -> Self {
        Self {
            packages,
            statistics,
            policy,
        }
    }

    pub fn policy(&self) -> StatisticsPolicy {
        self.policy
    }

    pub async fn average_shipping_time(
        &self,
        key: &StatisticKey,
        now: DateTime<Utc>,
    ) -> Result<AverageShippingTime> {
        let stored = match self.statistics.get(key).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("⚠️ Statistics lookup for {} failed, recomputing: {}", key, e);
                None
            }
        };

        if let Some(stat) = stored.as_ref().filter(|s| s.shipment_count > 0) {
            if now - stat.last_updated < self.policy.freshness {
                tracing::debug!("Statistics cache hit for {}", key);
                return Ok(AverageShippingTime {
                    average_days: Some(stat.average_days),
                    sample_count: stat.shipment_count,
                });
            }
        }

        tracing::debug!("Statistics cache miss for {}, scanning history", key);
        let result = self.recompute(key, now).await?;
        let Some(average_days) = result.average_days else {
            tracing::debug!("No completed shipments for {} in the history window", key);
            return Ok(result);
        };

        let refreshed = ShippingStatistic {
            key: key.clone(),
            average_days,
            shipment_count: result.sample_count,
            last_updated: now,
        };
        let written = if stored.is_some() {
            self.statistics.update(&refreshed).await
        } else {
            self.statistics.insert(&refreshed).await
        };
        if let Err(e) = written {
            tracing::warn!(
                "⚠️ Could not refresh statistics for {}, serving computed value: {}",
                key,
                e
            );
        }

        Ok(result)
    }

    async fn recompute(&self, key: &StatisticKey, now: DateTime<Utc>) -> Result<AverageShippingTime> {
        let query = PackageQuery {
            origin: key.origin.clone(),
            destination: key.destination.clone(),
            carrier: Some(key.carrier.clone()),
            status: STATUS_COMPLETED.to_string(),
            shipped_since: now - self.policy.history,
        };
        let history = self.packages.find(&query).await?;
        Ok(summarize(&history))
    }
}
