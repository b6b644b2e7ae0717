//! Category-code parsing from provider readings into snapshot fields.

use chrono::NaiveDate;

use common::store::ReadingSet;
use common::types::{WeatherCondition, WeatherSnapshot};

/// Precipitation amounts arrive as textual buckets rather than numbers.
///
/// "강수없음" means no precipitation, "1mm 미만" is reported as a trace
/// (0.5mm here), "30.0mm 이상" is capped at the leading number, and plain
/// readings carry an "mm" suffix.
pub fn parse_precipitation(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw == "강수없음" || raw == "0.0" {
        return Some(0.0);
    }
    if raw.contains("mm 미만") {
        return Some(0.5);
    }
    if let Some(head) = raw.strip_suffix("mm 이상") {
        return head.trim().parse().ok();
    }
    if let Some(head) = raw.strip_suffix("mm") {
        return head.trim().parse().ok();
    }
    raw.parse().ok()
}

/// Categorical condition from the SKY/PTY code pair. Precipitation type
/// wins over sky state when both are present.
pub fn condition_from_codes(sky: Option<i32>, pty: Option<i32>) -> Option<WeatherCondition> {
    match pty {
        Some(1) => return Some(WeatherCondition::LightRain),
        Some(2) => return Some(WeatherCondition::Sleet),
        Some(3) => return Some(WeatherCondition::Snow),
        Some(4) => return Some(WeatherCondition::HeavyRain),
        _ => {}
    }
    match sky {
        Some(1) => Some(WeatherCondition::Clear),
        Some(3) => Some(WeatherCondition::PartlyCloudy),
        Some(4) => Some(WeatherCondition::Cloudy),
        _ => None,
    }
}

fn value_f64(set: &ReadingSet, category: &str, date: NaiveDate) -> Option<f64> {
    set.first_value(category, date).and_then(|v| v.parse().ok())
}

fn value_i32(set: &ReadingSet, category: &str, date: NaiveDate) -> Option<i32> {
    set.first_value(category, date).and_then(|v| v.parse().ok())
}

/// Populate forecast fields on a snapshot from a short-range forecast
/// response, keeping only readings targeting `date`.
pub fn apply_forecast_readings(snapshot: &mut WeatherSnapshot, set: &ReadingSet, date: NaiveDate) {
    snapshot.temperature = value_f64(set, "TMP", date).or(snapshot.temperature);
    snapshot.temperature_min = value_f64(set, "TMN", date).or(snapshot.temperature_min);
    snapshot.temperature_max = value_f64(set, "TMX", date).or(snapshot.temperature_max);
    snapshot.humidity = value_i32(set, "REH", date).or(snapshot.humidity);
    snapshot.precipitation_probability = value_i32(set, "POP", date).or(snapshot.precipitation_probability);
    snapshot.wind_speed = value_f64(set, "WSD", date).or(snapshot.wind_speed);
    snapshot.sky_code = value_i32(set, "SKY", date).or(snapshot.sky_code);
    snapshot.precipitation_code = value_i32(set, "PTY", date).or(snapshot.precipitation_code);

    if let Some(raw) = set.first_value("PCP", date) {
        snapshot.precipitation = parse_precipitation(raw).or(snapshot.precipitation);
    }
    snapshot.condition =
        condition_from_codes(snapshot.sky_code, snapshot.precipitation_code).or(snapshot.condition);
    if let Some(raw) = set.first_value("LGT", date) {
        snapshot.lightning = raw.parse().ok().or(snapshot.lightning);
    }
}

/// Overlay now-cast observation fields. Now-cast readings are undated.
pub fn apply_nowcast_readings(snapshot: &mut WeatherSnapshot, set: &ReadingSet, date: NaiveDate) {
    if let Some(t) = value_f64(set, "T1H", date) {
        snapshot.current_temperature = Some(t);
        snapshot.has_current_data = true;
    }
    if let Some(h) = value_i32(set, "REH", date) {
        snapshot.current_humidity = Some(h);
        snapshot.has_current_data = true;
    }
    if let Some(w) = value_f64(set, "WSD", date) {
        snapshot.current_wind_speed = Some(w);
        snapshot.has_current_data = true;
    }
    if let Some(d) = value_i32(set, "VEC", date) {
        snapshot.current_wind_direction = Some(d);
        snapshot.has_current_data = true;
    }
    if let Some(raw) = set.first_value("RN1", date) {
        if let Some(amount) = parse_precipitation(raw) {
            snapshot.current_precipitation = Some(amount);
            snapshot.has_current_data = true;
        }
    }
    if let Some(raw) = set.first_value("PTY", date) {
        snapshot.current_precipitation_type = Some(raw.to_string());
        snapshot.has_current_data = true;
    }
}
