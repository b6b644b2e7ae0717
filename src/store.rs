//! In-memory store implementations backing the jobs.
//!
//! Notification preferences are seeded from config at startup; weather
//! rows live in a concurrent map keyed by (grid cell, date).

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Timelike};
use dashmap::DashMap;

use common::grid::GridCell;
use common::store::{NotificationStore, WeatherStore};
use common::types::{NotificationPreference, WeatherSnapshot};
use common::Result;

/// Config-seeded preference lookup.
pub struct MemoryNotificationStore {
    entries: Vec<NotificationPreference>,
}

impl MemoryNotificationStore {
    pub fn new(entries: Vec<NotificationPreference>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn find_enabled_with_coordinate(&self) -> Result<Vec<NotificationPreference>> {
        Ok(self
            .entries
            .iter()
            .filter(|p| p.is_active() && p.coordinate.is_some())
            .cloned()
            .collect())
    }

    async fn find_enabled_at(&self, time: NaiveTime) -> Result<Vec<NotificationPreference>> {
        // Exact minute match; seconds are not part of the schedule.
        let target = (time.hour(), time.minute());
        Ok(self
            .entries
            .iter()
            .filter(|p| {
                p.is_active() && (p.notify_at.hour(), p.notify_at.minute()) == target
            })
            .cloned()
            .collect())
    }
}

/// Concurrent (cell, date) keyed snapshot store.
#[derive(Default)]
pub struct MemoryWeatherStore {
    rows: DashMap<(GridCell, NaiveDate), WeatherSnapshot>,
}

impl MemoryWeatherStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[async_trait]
impl WeatherStore for MemoryWeatherStore {
    async fn find(&self, cell: GridCell, date: NaiveDate) -> Result<Option<WeatherSnapshot>> {
        Ok(self.rows.get(&(cell, date)).map(|r| r.value().clone()))
    }

    async fn save(&self, snapshot: WeatherSnapshot) -> Result<()> {
        self.rows
            .insert((snapshot.cell, snapshot.date), snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::grid::Coordinate;
    use common::types::AlertMode;

    fn make_preference(id: u64, notify_at: NaiveTime) -> NotificationPreference {
        NotificationPreference {
            id,
            user_id: id,
            webhook_url: "https://hooks.slack.com/services/T000/B000/x".into(),
            address: "Seoul".into(),
            coordinate: Coordinate::new(37.5635694, 126.980008).ok(),
            enabled: true,
            notify_at,
            mode: AlertMode::Daily,
            weather_types: None,
            temperature_threshold: None,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn time_match_is_exact_to_the_minute() {
        let seven = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
        let seven_thirty = NaiveTime::from_hms_opt(7, 30, 0).unwrap();
        let store = MemoryNotificationStore::new(vec![
            make_preference(1, seven),
            make_preference(2, seven_thirty),
        ]);

        let hits = store.find_enabled_at(seven).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);

        // Seconds on the query time do not break the minute match.
        let seven_and_change = NaiveTime::from_hms_opt(7, 0, 30).unwrap();
        let hits = store.find_enabled_at(seven_and_change).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn disabled_and_uncoordinated_entries_filtered() {
        let seven = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
        let mut disabled = make_preference(1, seven);
        disabled.enabled = false;
        let mut no_coord = make_preference(2, seven);
        no_coord.coordinate = None;
        let store =
            MemoryNotificationStore::new(vec![disabled, no_coord, make_preference(3, seven)]);

        let with_coord = store.find_enabled_with_coordinate().await.unwrap();
        assert_eq!(with_coord.len(), 1);
        assert_eq!(with_coord[0].id, 3);

        let at_seven = store.find_enabled_at(seven).await.unwrap();
        // The entry without a coordinate is still schedulable.
        assert_eq!(at_seven.len(), 2);
    }

    #[tokio::test]
    async fn weather_rows_upsert_by_cell_and_date() {
        let store = MemoryWeatherStore::new();
        let coord = Coordinate::new(37.5, 127.0).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut snap = WeatherSnapshot::new(1, date, coord, coord.grid());
        snap.temperature = Some(18.0);
        store.save(snap.clone()).await.unwrap();

        snap.current_temperature = Some(16.5);
        store.save(snap).await.unwrap();

        assert_eq!(store.len(), 1);
        let found = store.find(coord.grid(), date).await.unwrap().unwrap();
        assert_eq!(found.current_temperature, Some(16.5));
    }
}
