//! Publication-slot resolution for the provider's fixed release schedule.
//!
//! Short-range forecasts are published at 02/05/08/11/14/17/20/23 KST and
//! usable 15 minutes later; now-cast data lands on the hour, usable after
//! 10 minutes; the very-short-range forecast lands at :30, usable after
//! 45 minutes. All functions take `now` explicitly so they stay testable.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

use common::store::ReadingKind;

/// Hours at which the short-range forecast is published.
const FORECAST_HOURS: [u32; 8] = [2, 5, 8, 11, 14, 17, 20, 23];

/// Minutes after a forecast publication before it can be requested.
const FORECAST_DELAY_MIN: u32 = 15;
/// Minutes after the hour before now-cast data is available.
const NOWCAST_DELAY_MIN: u32 = 10;
/// Minutes past the hour before the :30 short forecast is available.
const SHORT_FORECAST_DELAY_MIN: u32 = 45;

/// The latest publication slot whose data is already usable at `now`.
///
/// Falls back to the previous day's last slot when nothing from today
/// qualifies yet (e.g. just after midnight).
pub fn resolve_publication_time(now: NaiveDateTime, kind: ReadingKind) -> NaiveDateTime {
    match kind {
        ReadingKind::Forecast => resolve_forecast(now),
        ReadingKind::NowCast => resolve_nowcast(now),
        ReadingKind::ShortForecast => resolve_short_forecast(now),
    }
}

fn resolve_forecast(now: NaiveDateTime) -> NaiveDateTime {
    let hour = now.hour();
    let minute = now.minute();

    let slot = FORECAST_HOURS
        .iter()
        .rev()
        .find(|&&h| h < hour || (h == hour && minute >= FORECAST_DELAY_MIN))
        .copied();

    match slot {
        Some(h) => at_hour(now, h),
        // Before 02:15 the newest usable slot is yesterday 23:00.
        None => at_hour(now - Duration::days(1), 23),
    }
}

fn resolve_nowcast(now: NaiveDateTime) -> NaiveDateTime {
    if now.minute() >= NOWCAST_DELAY_MIN {
        at_hour(now, now.hour())
    } else {
        at_hour(now - Duration::hours(1), (now.hour() + 23) % 24)
    }
}

fn resolve_short_forecast(now: NaiveDateTime) -> NaiveDateTime {
    let base = if now.minute() >= SHORT_FORECAST_DELAY_MIN {
        now
    } else {
        now - Duration::hours(1)
    };
    base.date()
        .and_time(NaiveTime::from_hms_opt(base.hour(), 30, 0).unwrap_or_default())
}

fn at_hour(reference: NaiveDateTime, hour: u32) -> NaiveDateTime {
    reference
        .date()
        .and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default())
}

/// Formats a slot as the provider's `base_date` parameter.
pub fn base_date_param(publication: NaiveDateTime) -> String {
    publication.format("%Y%m%d").to_string()
}

/// Formats a slot as the provider's `base_time` parameter.
pub fn base_time_param(publication: NaiveDateTime) -> String {
    publication.format("%H%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn forecast_before_first_slot_uses_previous_day() {
        let resolved = resolve_publication_time(at(2, 1, 50), ReadingKind::Forecast);
        assert_eq!(resolved, at(1, 23, 0));
    }

    #[test]
    fn forecast_slot_usable_fifteen_minutes_after_publication() {
        assert_eq!(
            resolve_publication_time(at(2, 2, 20), ReadingKind::Forecast),
            at(2, 2, 0)
        );
        // 14 minutes in: still on the previous slot.
        assert_eq!(
            resolve_publication_time(at(2, 2, 14), ReadingKind::Forecast),
            at(1, 23, 0)
        );
        assert_eq!(
            resolve_publication_time(at(2, 11, 14), ReadingKind::Forecast),
            at(2, 8, 0)
        );
    }

    #[test]
    fn forecast_between_slots_uses_latest_published() {
        assert_eq!(
            resolve_publication_time(at(2, 10, 0), ReadingKind::Forecast),
            at(2, 8, 0)
        );
        assert_eq!(
            resolve_publication_time(at(2, 23, 59), ReadingKind::Forecast),
            at(2, 23, 0)
        );
    }

    #[test]
    fn nowcast_usable_ten_minutes_after_the_hour() {
        assert_eq!(
            resolve_publication_time(at(2, 9, 12), ReadingKind::NowCast),
            at(2, 9, 0)
        );
        assert_eq!(
            resolve_publication_time(at(2, 9, 5), ReadingKind::NowCast),
            at(2, 8, 0)
        );
    }

    #[test]
    fn nowcast_wraps_over_midnight() {
        assert_eq!(
            resolve_publication_time(at(2, 0, 3), ReadingKind::NowCast),
            at(1, 23, 0)
        );
    }

    #[test]
    fn short_forecast_published_on_the_half_hour() {
        let resolved = resolve_publication_time(at(2, 9, 50), ReadingKind::ShortForecast);
        assert_eq!(resolved, at(2, 9, 0) + Duration::minutes(30));
        let earlier = resolve_publication_time(at(2, 9, 40), ReadingKind::ShortForecast);
        assert_eq!(earlier, at(2, 8, 0) + Duration::minutes(30));
    }

    #[test]
    fn request_params_format() {
        let slot = at(1, 23, 0);
        assert_eq!(base_date_param(slot), "20240501");
        assert_eq!(base_time_param(slot), "2300");
    }
}
