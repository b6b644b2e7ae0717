//! Weather fetch job: populate snapshot rows for every grid cell an
//! active notification resolves to, without duplicate provider calls.

use chrono::NaiveDateTime;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use common::grid::GridCell;
use common::store::{NotificationStore, ReadingKind, WeatherDataSource, WeatherStore};
use common::types::{FetchMode, NotificationPreference, WeatherSnapshot};
use common::Result;
use kma_client::basetime::resolve_publication_time;
use kma_client::parse::{apply_forecast_readings, apply_nowcast_readings};

/// Aggregate counts for one fetch cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    pub success: u32,
    pub skipped: u32,
    pub errors: u32,
}

enum CellOutcome {
    Success,
    Skipped,
    Error,
}

/// Run one fetch cycle. `now` drives publication-slot resolution and the
/// target date, so cycles are reproducible in tests.
///
/// Fails only when the candidate set cannot be enumerated; per-cell
/// provider or parse failures are counted and skipped.
pub async fn run(
    notifications: &dyn NotificationStore,
    weather: &dyn WeatherStore,
    source: &dyn WeatherDataSource,
    mode: FetchMode,
    now: NaiveDateTime,
) -> Result<FetchReport> {
    let candidates = notifications.find_enabled_with_coordinate().await?;
    let cells = unique_cells(&candidates);
    info!(
        total = candidates.len(),
        cells = cells.len(),
        ?mode,
        "starting weather fetch cycle"
    );

    let mut report = FetchReport::default();
    for (cell, pref) in cells {
        let outcome = match mode {
            FetchMode::Forecast => fetch_forecast(weather, source, cell, &pref, now).await,
            FetchMode::Current => fetch_nowcast(weather, source, cell, &pref, now).await,
            FetchMode::Comprehensive => {
                let forecast = fetch_forecast(weather, source, cell, &pref, now).await;
                let nowcast = fetch_nowcast(weather, source, cell, &pref, now).await;
                combine(forecast, nowcast)
            }
        };
        match outcome {
            CellOutcome::Success => report.success = report.success.saturating_add(1),
            CellOutcome::Skipped => report.skipped = report.skipped.saturating_add(1),
            CellOutcome::Error => report.errors = report.errors.saturating_add(1),
        }
    }

    info!(
        success = report.success,
        skipped = report.skipped,
        errors = report.errors,
        "weather fetch cycle finished"
    );
    Ok(report)
}

/// Distinct grid cells with one representative preference each, in
/// first-seen order. Many users can share a cell.
fn unique_cells(
    candidates: &[NotificationPreference],
) -> Vec<(GridCell, NotificationPreference)> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for pref in candidates {
        if let Some(cell) = pref.grid_cell() {
            if seen.insert(cell) {
                out.push((cell, pref.clone()));
            }
        }
    }
    out
}

async fn fetch_forecast(
    weather: &dyn WeatherStore,
    source: &dyn WeatherDataSource,
    cell: GridCell,
    pref: &NotificationPreference,
    now: NaiveDateTime,
) -> CellOutcome {
    let date = now.date();

    match weather.find(cell, date).await {
        Ok(Some(_)) => {
            debug!(%cell, %date, "snapshot already present, skipping");
            return CellOutcome::Skipped;
        }
        Ok(None) => {}
        Err(e) => {
            error!(%cell, "snapshot lookup failed: {e}");
            return CellOutcome::Error;
        }
    }

    let publication = resolve_publication_time(now, ReadingKind::Forecast);
    let set = match source.fetch(cell, publication, ReadingKind::Forecast).await {
        Ok(set) => set,
        Err(e) => {
            warn!(%cell, "forecast fetch failed: {e}");
            return CellOutcome::Error;
        }
    };
    if !set.readings.iter().any(|r| r.forecast_date == Some(date)) {
        warn!(%cell, %date, "no forecast readings for target date");
        return CellOutcome::Error;
    }

    let Some(coordinate) = pref.coordinate else {
        return CellOutcome::Error;
    };
    let mut snapshot = WeatherSnapshot::new(pref.user_id, date, coordinate, cell);
    apply_forecast_readings(&mut snapshot, &set, date);

    match weather.save(snapshot).await {
        Ok(()) => {
            debug!(%cell, "forecast snapshot saved");
            CellOutcome::Success
        }
        Err(e) => {
            error!(%cell, "snapshot save failed: {e}");
            CellOutcome::Error
        }
    }
}

async fn fetch_nowcast(
    weather: &dyn WeatherStore,
    source: &dyn WeatherDataSource,
    cell: GridCell,
    pref: &NotificationPreference,
    now: NaiveDateTime,
) -> CellOutcome {
    let date = now.date();

    // Now-cast values change intra-day: update the row in place rather
    // than skipping when one exists.
    let existing = match weather.find(cell, date).await {
        Ok(existing) => existing,
        Err(e) => {
            error!(%cell, "snapshot lookup failed: {e}");
            return CellOutcome::Error;
        }
    };

    let publication = resolve_publication_time(now, ReadingKind::NowCast);
    let set = match source.fetch(cell, publication, ReadingKind::NowCast).await {
        Ok(set) => set,
        Err(e) => {
            warn!(%cell, "now-cast fetch failed: {e}");
            return CellOutcome::Error;
        }
    };
    if set.is_empty() {
        warn!(%cell, "empty now-cast payload");
        return CellOutcome::Error;
    }

    let mut snapshot = match existing {
        Some(row) => row,
        None => {
            let Some(coordinate) = pref.coordinate else {
                return CellOutcome::Error;
            };
            WeatherSnapshot::new(pref.user_id, date, coordinate, cell)
        }
    };
    apply_nowcast_readings(&mut snapshot, &set, date);

    match weather.save(snapshot).await {
        Ok(()) => {
            debug!(%cell, "now-cast overlay saved");
            CellOutcome::Success
        }
        Err(e) => {
            error!(%cell, "snapshot save failed: {e}");
            CellOutcome::Error
        }
    }
}

fn combine(forecast: CellOutcome, nowcast: CellOutcome) -> CellOutcome {
    match (forecast, nowcast) {
        (CellOutcome::Error, _) | (_, CellOutcome::Error) => CellOutcome::Error,
        (CellOutcome::Skipped, CellOutcome::Skipped) => CellOutcome::Skipped,
        _ => CellOutcome::Success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryNotificationStore, MemoryWeatherStore};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};
    use common::grid::Coordinate;
    use common::store::{Reading, ReadingSet};
    use common::types::AlertMode;
    use common::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn make_preference(id: u64, lat: f64, lon: f64) -> NotificationPreference {
        NotificationPreference {
            id,
            user_id: id,
            webhook_url: "https://hooks.slack.com/services/T000/B000/x".into(),
            address: format!("place {id}"),
            coordinate: Coordinate::new(lat, lon).ok(),
            enabled: true,
            notify_at: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            mode: AlertMode::Daily,
            weather_types: None,
            temperature_threshold: None,
            deleted_at: None,
        }
    }

    /// Counts calls and fails for cells in the deny list.
    struct FakeSource {
        calls: AtomicU32,
        fail_gx: Option<i32>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_gx: None,
            }
        }

        fn failing_for(gx: i32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_gx: Some(gx),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherDataSource for FakeSource {
        async fn fetch(
            &self,
            cell: GridCell,
            _publication: NaiveDateTime,
            kind: ReadingKind,
        ) -> Result<ReadingSet> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_gx == Some(cell.gx) {
                return Err(Error::Provider("NO_DATA".into()));
            }
            let date = (kind == ReadingKind::Forecast)
                .then(|| NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
            let (category, value) = match kind {
                ReadingKind::Forecast => ("TMP", "18.0"),
                _ => ("T1H", "15.5"),
            };
            Ok(ReadingSet {
                readings: vec![Reading {
                    category: category.into(),
                    value: value.into(),
                    forecast_date: date,
                }],
            })
        }
    }

    #[tokio::test]
    async fn forecast_mode_is_idempotent_per_day() {
        let notifications = MemoryNotificationStore::new(vec![
            make_preference(1, 37.5635694, 126.980008),
        ]);
        let weather = MemoryWeatherStore::new();
        let source = FakeSource::new();

        let first = run(&notifications, &weather, &source, FetchMode::Forecast, noon())
            .await
            .unwrap();
        assert_eq!(first, FetchReport { success: 1, skipped: 0, errors: 0 });

        let second = run(&notifications, &weather, &source, FetchMode::Forecast, noon())
            .await
            .unwrap();
        assert_eq!(second, FetchReport { success: 0, skipped: 1, errors: 0 });

        // The second cycle made no provider call and wrote nothing new.
        assert_eq!(source.calls(), 1);
        assert_eq!(weather.len(), 1);
    }

    #[tokio::test]
    async fn shared_cells_fetch_once() {
        // Two city-hall-adjacent users in cell (60,127), one in (61,127).
        let notifications = MemoryNotificationStore::new(vec![
            make_preference(1, 37.5635694, 126.980008),
            make_preference(2, 37.5703778, 126.9816417),
            make_preference(3, 37.5692111, 127.007155),
        ]);
        let weather = MemoryWeatherStore::new();
        let source = FakeSource::new();

        let report = run(&notifications, &weather, &source, FetchMode::Forecast, noon())
            .await
            .unwrap();
        assert_eq!(report.success, 2);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn provider_failure_is_isolated_per_cell() {
        let notifications = MemoryNotificationStore::new(vec![
            make_preference(1, 37.5635694, 126.980008), // (60,127)
            make_preference(2, 37.5692111, 127.007155), // (61,127)
        ]);
        let weather = MemoryWeatherStore::new();
        let source = FakeSource::failing_for(60);

        let report = run(&notifications, &weather, &source, FetchMode::Forecast, noon())
            .await
            .unwrap();
        assert_eq!(report, FetchReport { success: 1, skipped: 0, errors: 1 });
        assert_eq!(weather.len(), 1);
    }

    #[tokio::test]
    async fn current_mode_updates_existing_row_in_place() {
        let notifications = MemoryNotificationStore::new(vec![
            make_preference(1, 37.5635694, 126.980008),
        ]);
        let weather = MemoryWeatherStore::new();
        let source = FakeSource::new();

        run(&notifications, &weather, &source, FetchMode::Forecast, noon())
            .await
            .unwrap();
        let report = run(&notifications, &weather, &source, FetchMode::Current, noon())
            .await
            .unwrap();
        assert_eq!(report.success, 1);
        assert_eq!(weather.len(), 1);

        let cell = Coordinate::new(37.5635694, 126.980008).unwrap().grid();
        let row = weather
            .find(cell, noon().date())
            .await
            .unwrap()
            .unwrap();
        // Forecast fields kept, now-cast overlay added.
        assert_eq!(row.temperature, Some(18.0));
        assert_eq!(row.current_temperature, Some(15.5));
        assert!(row.has_current_data);
    }

    #[tokio::test]
    async fn comprehensive_mode_fetches_both_products() {
        let notifications = MemoryNotificationStore::new(vec![
            make_preference(1, 37.5635694, 126.980008),
        ]);
        let weather = MemoryWeatherStore::new();
        let source = FakeSource::new();

        let report = run(
            &notifications,
            &weather,
            &source,
            FetchMode::Comprehensive,
            noon(),
        )
        .await
        .unwrap();
        assert_eq!(report.success, 1);
        assert_eq!(source.calls(), 2);

        let cell = Coordinate::new(37.5635694, 126.980008).unwrap().grid();
        let row = weather
            .find(cell, noon().date())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.temperature, Some(18.0));
        assert_eq!(row.current_temperature, Some(15.5));
    }
}
