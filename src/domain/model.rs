use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const STATUS_COMPLETED: &str = "Completed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    #[serde(default)]
    pub tracking_number: String,
    pub carrier: String,
    pub status: String,
    #[serde(deserialize_with = "carrier_time::required")]
    pub shipping_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "carrier_time::optional")]
    pub delivery_date: Option<DateTime<Utc>>,
    pub origin: String,
    pub destination: String,
}

impl PackageRecord {
    /// Delivery time in fractional days, or `None` when undelivered or when
    /// the delivery date precedes the shipping date.
    pub fn shipping_days(&self) -> Option<f64> {
        let delivered = self.delivery_date?;
        let elapsed = delivered - self.shipping_date;
        if elapsed < Duration::zero() {
            return None;
        }
        Some(elapsed.num_milliseconds() as f64 / MILLIS_PER_DAY)
    }

    /// Replaces every mutable field with the fresh copy's value. No field of
    /// the old record survives, including a delivery date the fresh copy lacks.
    pub fn overwrite_from(&mut self, fresh: &PackageRecord) {
        self.carrier = fresh.carrier.clone();
        self.status = fresh.status.clone();
        self.shipping_date = fresh.shipping_date;
        self.destination = fresh.destination.clone();
        self.delivery_date = fresh.delivery_date;
        self.origin = fresh.origin.clone();
    }

    pub fn statistic_key(&self) -> StatisticKey {
        StatisticKey::new(&self.origin, &self.destination, &self.carrier)
    }
}

/// Timestamps as the carrier API sends them: RFC 3339, or a bare local
/// date-time read as UTC.
mod carrier_time {
    use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    pub fn required<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    /// `0001-01-01T00:00:00` is the API's placeholder for "not delivered".
    pub fn optional<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let parsed = parse(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))?;
        Ok((parsed.year() > 1).then_some(parsed))
    }
}

pub(crate) const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatisticKey {
    pub origin: String,
    pub destination: String,
    pub carrier: String,
}

impl StatisticKey {
    pub fn new(origin: &str, destination: &str, carrier: &str) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            carrier: carrier.to_string(),
        }
    }
}

impl fmt::Display for StatisticKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} via {}", self.origin, self.destination, self.carrier)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingStatistic {
    pub key: StatisticKey,
    pub average_days: f64,
    pub shipment_count: u32,
    pub last_updated: DateTime<Utc>,
}

/// Filter for the history scan over stored packages.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageQuery {
    pub origin: String,
    pub destination: String,
    pub carrier: Option<String>,
    pub status: String,
    pub shipped_since: DateTime<Utc>,
}

impl PackageQuery {
    pub fn matches(&self, record: &PackageRecord) -> bool {
        record.origin == self.origin
            && record.destination == self.destination
            && self
                .carrier
                .as_deref()
                .map_or(true, |carrier| record.carrier == carrier)
            && record.status == self.status
            && record.shipping_date >= self.shipped_since
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageShippingTime {
    pub average_days: Option<f64>,
    pub sample_count: u32,
}

impl AverageShippingTime {
    pub fn no_data() -> Self {
        Self {
            average_days: None,
            sample_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ArrivalEstimate {
    ExpectedBy(DateTime<Utc>),
    ShouldHaveArrived,
    NoData,
}

impl ArrivalEstimate {
    pub fn project(shipping_date: DateTime<Utc>, average_days: Option<f64>, now: DateTime<Utc>) -> Self {
        let Some(days) = average_days else {
            return Self::NoData;
        };
        let expected = shipping_date + Duration::milliseconds((days * MILLIS_PER_DAY).round() as i64);
        if expected < now {
            Self::ShouldHaveArrived
        } else {
            Self::ExpectedBy(expected)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDetails {
    pub package: PackageRecord,
    pub weather_warning: Option<String>,
    pub average_shipping_days: Option<f64>,
    pub sample_count: u32,
    pub estimate: ArrivalEstimate,
}

impl fmt::Display for PackageDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.package;
        writeln!(f, "Tracking number: {}", p.tracking_number)?;
        writeln!(f, "Carrier:         {}", p.carrier)?;
        writeln!(f, "Status:          {}", p.status)?;
        writeln!(f, "Route:           {} -> {}", p.origin, p.destination)?;
        writeln!(f, "Shipped:         {}", p.shipping_date.format("%Y-%m-%d"))?;
        match p.delivery_date {
            Some(date) => writeln!(f, "Delivered:       {}", date.format("%Y-%m-%d"))?,
            None => writeln!(f, "Delivered:       -")?,
        }
        if let Some(warning) = &self.weather_warning {
            writeln!(f, "Weather:         {}", warning)?;
        }
        match self.average_shipping_days {
            Some(days) => writeln!(f, "Average time:    {:.2} days", days)?,
            None => writeln!(f, "Average time:    no data")?,
        }
        writeln!(f, "Sample size:     {}", self.sample_count)?;
        match self.estimate {
            ArrivalEstimate::ExpectedBy(date) => {
                write!(f, "Estimated:       {}", date.format("%Y-%m-%d"))
            }
            ArrivalEstimate::ShouldHaveArrived => {
                write!(f, "Estimated:       should have already arrived")
            }
            ArrivalEstimate::NoData => write!(f, "Estimated:       no data"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 1, 9, 0, 0).unwrap()
    }

    fn record(delivery_offset_days: Option<i64>) -> PackageRecord {
        PackageRecord {
            tracking_number: "1Z999AA101".to_string(),
            carrier: "X".to_string(),
            status: STATUS_COMPLETED.to_string(),
            shipping_date: t0(),
            delivery_date: delivery_offset_days.map(|d| t0() + Duration::days(d)),
            origin: "NYC".to_string(),
            destination: "LA".to_string(),
        }
    }

    #[test]
    fn test_shipping_days() {
        assert_eq!(record(Some(4)).shipping_days(), Some(4.0));
        assert_eq!(record(Some(0)).shipping_days(), Some(0.0));
        assert_eq!(record(None).shipping_days(), None);
        assert_eq!(record(Some(-2)).shipping_days(), None);
    }

    #[test]
    fn test_estimate_in_the_past_reports_arrived() {
        let estimate = ArrivalEstimate::project(t0(), Some(5.0), t0() + Duration::days(7));
        assert_eq!(estimate, ArrivalEstimate::ShouldHaveArrived);
    }

    #[test]
    fn test_estimate_in_the_future_reports_date() {
        let estimate = ArrivalEstimate::project(t0(), Some(5.0), t0() + Duration::days(3));
        assert_eq!(estimate, ArrivalEstimate::ExpectedBy(t0() + Duration::days(5)));
    }

    #[test]
    fn test_estimate_without_average() {
        assert_eq!(ArrivalEstimate::project(t0(), None, t0()), ArrivalEstimate::NoData);
    }

    #[test]
    fn test_query_matches_optional_carrier() {
        let mut query = PackageQuery {
            origin: "NYC".to_string(),
            destination: "LA".to_string(),
            carrier: Some("Y".to_string()),
            status: STATUS_COMPLETED.to_string(),
            shipped_since: t0() - Duration::days(60),
        };
        assert!(!query.matches(&record(Some(2))));
        query.carrier = None;
        assert!(query.matches(&record(Some(2))));
    }

    #[test]
    fn test_record_deserializes_camel_case() {
        let json = r#"{
            "trackingNumber": "1Z999AA101",
            "carrier": "UPS",
            "status": "In Transit",
            "shippingDate": "2024-12-01T09:00:00Z",
            "origin": "NYC",
            "destination": "LA"
        }"#;
        let parsed: PackageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.carrier, "UPS");
        assert!(parsed.delivery_date.is_none());
    }

    #[test]
    fn test_record_accepts_offsetless_timestamps() {
        let json = r#"{
            "trackingNumber": "1Z999AA101",
            "carrier": "UPS",
            "status": "In Transit",
            "shippingDate": "2024-12-01T09:00:00",
            "deliveryDate": "0001-01-01T00:00:00",
            "origin": "NYC",
            "destination": "LA"
        }"#;
        let parsed: PackageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.shipping_date, t0());
        assert!(parsed.delivery_date.is_none());

        let delivered = json.replace("0001-01-01T00:00:00", "2024-12-03T21:00:00.123");
        let parsed: PackageRecord = serde_json::from_str(&delivered).unwrap();
        assert_eq!(
            parsed.delivery_date,
            Some(t0() + Duration::hours(60) + Duration::milliseconds(123))
        );
    }

    #[test]
    fn test_record_rejects_unparseable_timestamp() {
        let json = r#"{"carrier":"UPS","status":"Completed","shippingDate":"yesterday","origin":"NYC","destination":"LA"}"#;
        assert!(serde_json::from_str::<PackageRecord>(json).is_err());
    }

    #[test]
    fn test_details_display_always_shows_sample_count() {
        let details = PackageDetails {
            package: record(None),
            weather_warning: None,
            average_shipping_days: None,
            sample_count: 0,
            estimate: ArrivalEstimate::NoData,
        };
        let text = details.to_string();
        assert!(text.contains("Average time:    no data"));
        assert!(text.contains("Sample size:     0"));
    }
}
