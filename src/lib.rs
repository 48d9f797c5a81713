pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::TrackerConfig;

pub use adapters::http::{PackageApiClient, WeatherApiClient};
pub use adapters::storage::{MemoryStore, SqliteStore};
pub use crate::core::{
    reconcile::Reconciler,
    stats_cache::{AggregateCache, StatisticsPolicy},
    tracker::{StoredPackage, TrackingOrchestrator, WeatherRule},
};
pub use domain::model::{
    ArrivalEstimate, AverageShippingTime, PackageDetails, PackageRecord, ShippingStatistic,
    StatisticKey,
};
pub use utils::error::{Result, TrackerError};
