use crate::domain::model::{PackageQuery, PackageRecord, ShippingStatistic, StatisticKey};
use crate::domain::ports::{PackageStore, StatisticsStore};
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "BEGIN;
CREATE TABLE IF NOT EXISTS packages(
    tracking_number TEXT PRIMARY KEY,
    carrier TEXT NOT NULL,
    status TEXT NOT NULL,
    shipping_date INTEGER NOT NULL,
    delivery_date INTEGER,
    origin TEXT NOT NULL,
    destination TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_packages_route
    ON packages(origin, destination, carrier, status, shipping_date);
CREATE TABLE IF NOT EXISTS shipping_statistics(
    origin TEXT NOT NULL,
    destination TEXT NOT NULL,
    carrier TEXT NOT NULL,
    average_days REAL NOT NULL,
    shipment_count INTEGER NOT NULL,
    last_updated INTEGER NOT NULL,
    PRIMARY KEY(origin, destination, carrier)
);
COMMIT;";

const PACKAGE_COLUMNS: &str =
    "tracking_number, carrier, status, shipping_date, delivery_date, origin, destination";

/// Durable store for packages and statistics in a single SQLite file.
///
/// Timestamps are stored as unix milliseconds so range filters compare
/// numerically. Inserts are single-statement upserts, so two writers racing
/// on a new key end with the last writer's row instead of a conflict.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&db_path)?;
        Self::with_connection(conn, Some(db_path))
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("SQLite store ready at {:?}", db_path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Runs `op` against the connection on the blocking pool.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| TrackerError::persistence("connection lock poisoned"))?;
            op(&guard).map_err(|e| TrackerError::persistence(e.to_string()))
        })
        .await
        .map_err(|e| TrackerError::persistence(format!("database task failed: {}", e)))?
    }
}

type PackageRow = (String, String, String, i64, Option<i64>, String, String);

fn read_package_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PackageRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn from_millis(field: &str, millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| TrackerError::persistence(format!("{} out of range: {}", field, millis)))
}

fn package_from_row(row: PackageRow) -> Result<PackageRecord> {
    let (tracking_number, carrier, status, shipped, delivered, origin, destination) = row;
    Ok(PackageRecord {
        tracking_number,
        carrier,
        status,
        shipping_date: from_millis("shipping_date", shipped)?,
        delivery_date: delivered
            .map(|ms| from_millis("delivery_date", ms))
            .transpose()?,
        origin,
        destination,
    })
}

fn statistic_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(StatisticKey, f64, u32, i64)> {
    Ok((
        StatisticKey {
            origin: row.get(0)?,
            destination: row.get(1)?,
            carrier: row.get(2)?,
        },
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn build_statistic(raw: (StatisticKey, f64, u32, i64)) -> Result<ShippingStatistic> {
    let (key, average_days, shipment_count, updated) = raw;
    Ok(ShippingStatistic {
        key,
        average_days,
        shipment_count,
        last_updated: from_millis("last_updated", updated)?,
    })
}

#[async_trait]
impl PackageStore for SqliteStore {
    async fn get(&self, tracking_number: &str) -> Result<Option<PackageRecord>> {
        let tracking_number = tracking_number.to_string();
        let row = self.run(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM packages WHERE tracking_number = ?1",
                    PACKAGE_COLUMNS
                ),
                params![tracking_number],
                read_package_row,
            )
            .optional()
        })
        .await?;
        row.map(package_from_row).transpose()
    }

    async fn insert(&self, record: &PackageRecord) -> Result<()> {
        let record = record.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO packages(tracking_number, carrier, status, shipping_date, delivery_date, origin, destination)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(tracking_number) DO UPDATE SET
                    carrier = excluded.carrier,
                    status = excluded.status,
                    shipping_date = excluded.shipping_date,
                    delivery_date = excluded.delivery_date,
                    origin = excluded.origin,
                    destination = excluded.destination",
                params![
                    record.tracking_number,
                    record.carrier,
                    record.status,
                    record.shipping_date.timestamp_millis(),
                    record.delivery_date.map(|d| d.timestamp_millis()),
                    record.origin,
                    record.destination,
                ],
            )
        })
        .await?;
        Ok(())
    }

    async fn update(&self, record: &PackageRecord) -> Result<()> {
        let number = record.tracking_number.clone();
        let record = record.clone();
        let changed = self.run(move |conn| {
            conn.execute(
                "UPDATE packages SET carrier = ?2, status = ?3, shipping_date = ?4,
                    delivery_date = ?5, origin = ?6, destination = ?7
                 WHERE tracking_number = ?1",
                params![
                    record.tracking_number,
                    record.carrier,
                    record.status,
                    record.shipping_date.timestamp_millis(),
                    record.delivery_date.map(|d| d.timestamp_millis()),
                    record.origin,
                    record.destination,
                ],
            )
        })
        .await?;
        if changed == 0 {
            return Err(TrackerError::persistence(format!(
                "no package {} to update",
                number
            )));
        }
        Ok(())
    }

    async fn find(&self, query: &PackageQuery) -> Result<Vec<PackageRecord>> {
        let query = query.clone();
        let rows = self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM packages
                 WHERE origin = ?1 AND destination = ?2
                   AND (?3 IS NULL OR carrier = ?3)
                   AND status = ?4 AND shipping_date >= ?5
                 ORDER BY shipping_date",
                PACKAGE_COLUMNS
            ))?;
            let rows = stmt.query_map(
                params![
                    query.origin,
                    query.destination,
                    query.carrier,
                    query.status,
                    query.shipped_since.timestamp_millis(),
                ],
                read_package_row,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await?;
        rows.into_iter().map(package_from_row).collect()
    }
}

#[async_trait]
impl StatisticsStore for SqliteStore {
    async fn get(&self, key: &StatisticKey) -> Result<Option<ShippingStatistic>> {
        let key = key.clone();
        let raw = self.run(move |conn| {
            conn.query_row(
                "SELECT origin, destination, carrier, average_days, shipment_count, last_updated
                 FROM shipping_statistics
                 WHERE origin = ?1 AND destination = ?2 AND carrier = ?3",
                params![key.origin, key.destination, key.carrier],
                statistic_from_row,
            )
            .optional()
        })
        .await?;
        raw.map(build_statistic).transpose()
    }

    async fn insert(&self, statistic: &ShippingStatistic) -> Result<()> {
        let statistic = statistic.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO shipping_statistics(origin, destination, carrier, average_days, shipment_count, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(origin, destination, carrier) DO UPDATE SET
                    average_days = excluded.average_days,
                    shipment_count = excluded.shipment_count,
                    last_updated = excluded.last_updated",
                params![
                    statistic.key.origin,
                    statistic.key.destination,
                    statistic.key.carrier,
                    statistic.average_days,
                    statistic.shipment_count,
                    statistic.last_updated.timestamp_millis(),
                ],
            )
        })
        .await?;
        Ok(())
    }

    async fn update(&self, statistic: &ShippingStatistic) -> Result<()> {
        let key = statistic.key.clone();
        let statistic = statistic.clone();
        let changed = self.run(move |conn| {
            conn.execute(
                "UPDATE shipping_statistics
                 SET average_days = ?4, shipment_count = ?5, last_updated = ?6
                 WHERE origin = ?1 AND destination = ?2 AND carrier = ?3",
                params![
                    statistic.key.origin,
                    statistic.key.destination,
                    statistic.key.carrier,
                    statistic.average_days,
                    statistic.shipment_count,
                    statistic.last_updated.timestamp_millis(),
                ],
            )
        })
        .await?;
        if changed == 0 {
            return Err(TrackerError::persistence(format!(
                "no statistic {} to update",
                key
            )));
        }
        Ok(())
    }

    async fn list_for_route(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Vec<ShippingStatistic>> {
        let (origin, destination) = (origin.to_string(), destination.to_string());
        let raw = self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT origin, destination, carrier, average_days, shipment_count, last_updated
                 FROM shipping_statistics
                 WHERE origin = ?1 AND destination = ?2
                 ORDER BY carrier",
            )?;
            let rows = stmt.query_map(params![origin, destination], statistic_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await?;
        raw.into_iter().map(build_statistic).collect()
    }
}
