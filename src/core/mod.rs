pub mod reconcile;
pub mod stats_cache;
pub mod tracker;

pub use crate::domain::model::{PackageDetails, PackageRecord, ShippingStatistic};
pub use crate::domain::ports::{PackageSource, PackageStore, StatisticsStore, WeatherSource};
pub use crate::utils::error::Result;
