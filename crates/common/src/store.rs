//! Collaborator interfaces the jobs depend on.
//!
//! The pipelines only ever see these traits; concrete implementations
//! (provider HTTP client, in-memory stores, webhook sink) live in the
//! other crates and the binary.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::grid::GridCell;
use crate::types::{NotificationPreference, WeatherSnapshot};
use crate::Result;

/// Which provider product a fetch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadingKind {
    /// Short-range forecast, published eight times a day.
    Forecast,
    /// Observed conditions for the current hour.
    NowCast,
    /// Very-short-range forecast, published on the half hour.
    ShortForecast,
}

/// One category-coded value from a provider response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Provider category code, e.g. `TMP`, `POP`, `PTY`.
    pub category: String,
    /// Raw value string; numeric for most categories, textual buckets
    /// for precipitation amount.
    pub value: String,
    /// Forecast target date for forecast products, absent for now-cast.
    pub forecast_date: Option<NaiveDate>,
}

/// The parsed payload of one provider call.
#[derive(Debug, Clone, Default)]
pub struct ReadingSet {
    pub readings: Vec<Reading>,
}

impl ReadingSet {
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// First value for a category on the given date (or undated),
    /// in response order.
    pub fn first_value(&self, category: &str, date: NaiveDate) -> Option<&str> {
        self.readings
            .iter()
            .filter(|r| r.category == category)
            .find(|r| r.forecast_date.map_or(true, |d| d == date))
            .map(|r| r.value.as_str())
    }
}

/// External weather provider.
#[async_trait]
pub trait WeatherDataSource: Send + Sync {
    /// Fetch readings for one grid cell. `publication` is the provider
    /// slot resolved from the wall clock, see the publication schedule
    /// helpers in the client crate.
    async fn fetch(
        &self,
        cell: GridCell,
        publication: NaiveDateTime,
        kind: ReadingKind,
    ) -> Result<ReadingSet>;
}

/// Lookup of registered notification preferences.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// All enabled, non-deleted preferences that have a resolved coordinate.
    async fn find_enabled_with_coordinate(&self) -> Result<Vec<NotificationPreference>>;

    /// All enabled, non-deleted preferences configured for exactly this
    /// time of day (minute precision).
    async fn find_enabled_at(&self, time: NaiveTime) -> Result<Vec<NotificationPreference>>;
}

/// Persistence of fetched weather rows, keyed by (cell, date).
#[async_trait]
pub trait WeatherStore: Send + Sync {
    async fn find(&self, cell: GridCell, date: NaiveDate) -> Result<Option<WeatherSnapshot>>;

    async fn save(&self, snapshot: WeatherSnapshot) -> Result<()>;
}

/// Outbound message sink. Sending never errors across this boundary;
/// failures are reported as `false` and counted by the caller.
#[async_trait]
pub trait DispatchSink: Send + Sync {
    async fn send(&self, endpoint: &str, message: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_set() -> ReadingSet {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1);
        ReadingSet {
            readings: vec![
                Reading {
                    category: "TMP".into(),
                    value: "18.0".into(),
                    forecast_date: date,
                },
                Reading {
                    category: "TMP".into(),
                    value: "21.0".into(),
                    forecast_date: NaiveDate::from_ymd_opt(2024, 5, 2),
                },
                Reading {
                    category: "T1H".into(),
                    value: "15.5".into(),
                    forecast_date: None,
                },
            ],
        }
    }

    #[test]
    fn first_value_filters_by_category_and_date() {
        let set = make_set();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(set.first_value("TMP", date), Some("18.0"));
        // Undated now-cast readings match any date.
        assert_eq!(set.first_value("T1H", date), Some("15.5"));
        assert_eq!(set.first_value("POP", date), None);
    }

    #[test]
    fn first_value_outlives_a_transient_category_borrow() {
        // The returned value borrows the set, not the category string.
        let set = make_set();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let value = {
            let category = String::from("TMP");
            set.first_value(&category, date)
        };
        assert_eq!(value, Some("18.0"));
    }
}
