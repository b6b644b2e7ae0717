//! Notification matching rules.
//!
//! Every predicate here is total over snapshots with missing fields: an
//! absent value never satisfies a condition and never panics.

use common::types::{AlertMode, NotificationPreference, WeatherCondition, WeatherSnapshot};
use common::types::WeatherStatus;

/// Whether a preference fires against a snapshot.
pub fn should_alert(pref: &NotificationPreference, snapshot: &WeatherSnapshot) -> bool {
    match pref.mode {
        // Daily digests fire unconditionally at their configured time.
        AlertMode::Daily => true,
        AlertMode::Temperature => match (pref.temperature_threshold, snapshot.current_temp()) {
            (Some(threshold), Some(temp)) => temp <= f64::from(threshold),
            _ => false,
        },
        AlertMode::WeatherType => {
            let tags = pref.weather_type_tags();
            let matched = !tags.is_empty()
                && snapshot
                    .condition
                    .map(|c| tags.contains(&c))
                    .unwrap_or(false);
            matched || is_severe(snapshot)
        }
    }
}

/// Composite severe-weather predicate, independent of user preferences.
pub fn is_severe(snapshot: &WeatherSnapshot) -> bool {
    if snapshot.precipitation_probability.map(|p| p >= 70) == Some(true) {
        return true;
    }
    if snapshot.current_wind().map(|w| w >= 15.0) == Some(true) {
        return true;
    }
    if snapshot.current_temp().map(|t| t <= 0.0 || t >= 35.0) == Some(true) {
        return true;
    }
    if matches!(
        snapshot.condition,
        Some(WeatherCondition::HeavyRain | WeatherCondition::Snow | WeatherCondition::Thunderstorm)
    ) {
        return true;
    }
    if snapshot.uv_index.map(|uv| uv >= 8) == Some(true) {
        return true;
    }
    if snapshot.lightning.map(|l| l > 0.0) == Some(true) {
        return true;
    }
    // PTY 3 is snow, 4 is showers.
    if matches!(snapshot.precipitation_code, Some(3 | 4)) {
        return true;
    }
    snapshot.has_active_precipitation()
}

/// Whether conditions invite being outside. Absent optional fields do not
/// disqualify; the condition code itself must look pleasant.
pub fn is_good_outdoor(snapshot: &WeatherSnapshot) -> bool {
    if snapshot.has_active_precipitation() || is_severe(snapshot) {
        return false;
    }
    let pleasant_condition = matches!(
        snapshot.condition,
        Some(WeatherCondition::Clear | WeatherCondition::PartlyCloudy)
    );
    let low_rain_chance = snapshot.precipitation_probability.map(|p| p <= 20) != Some(false);
    let mild_temp = snapshot
        .current_temp()
        .map(|t| (15.0..=28.0).contains(&t))
        != Some(false);
    let calm_wind = snapshot.current_wind().map(|w| w <= 10.0) != Some(false);
    let no_lightning = snapshot.lightning.map(|l| l <= 0.0) != Some(false);

    pleasant_condition && low_rain_chance && mild_temp && calm_wind && no_lightning
}

/// Header classification for rendered messages.
pub fn overall_status(snapshot: &WeatherSnapshot) -> WeatherStatus {
    if is_severe(snapshot) {
        WeatherStatus::Alert
    } else if !is_good_outdoor(snapshot) {
        WeatherStatus::Caution
    } else {
        WeatherStatus::Good
    }
}

/// Graded warning lines for the emergency block of a message.
pub fn severe_alert_lines(snapshot: &WeatherSnapshot) -> Vec<String> {
    let mut alerts = Vec::new();

    if let Some(prob) = snapshot.precipitation_probability {
        if prob >= 70 {
            alerts.push(format!("High chance of precipitation: {prob}%"));
        }
    }

    if let Some(wind) = snapshot.current_wind() {
        if wind >= 21.0 {
            alerts.push(format!("Wind warning: {wind}m/s (dangerous)"));
        } else if wind >= 14.0 {
            alerts.push(format!("Wind advisory: {wind}m/s (use caution)"));
        }
    }

    if let Some(temp) = snapshot.current_temp() {
        if temp <= -12.0 {
            alerts.push(format!("Cold wave warning: {}°C (dangerous)", temp as i32));
        } else if temp <= -5.0 {
            alerts.push(format!("Cold wave advisory: {}°C (use caution)", temp as i32));
        } else if temp >= 38.0 {
            alerts.push(format!("Heat wave warning: {}°C (dangerous)", temp as i32));
        } else if temp >= 35.0 {
            alerts.push(format!("Heat wave advisory: {}°C (use caution)", temp as i32));
        }
    }

    if snapshot.has_active_precipitation() {
        if let Some(rain) = snapshot.current_precipitation {
            if rain >= 50.0 {
                alerts.push(format!("Torrential rain: {rain}mm/h (dangerous)"));
            } else if rain >= 20.0 {
                alerts.push(format!("Heavy rain: {rain}mm/h (use caution)"));
            } else if rain > 0.0 {
                alerts.push(format!("Precipitation in progress: {rain}mm/h"));
            }
        }
    }

    if snapshot.lightning.map(|l| l > 0.0) == Some(true) {
        alerts.push("Lightning risk: avoid outdoor activity".to_string());
    }

    if let Some(uv) = snapshot.uv_index {
        if uv >= 11 {
            alerts.push(format!("Extreme UV: {uv} (stay indoors)"));
        } else if uv >= 8 {
            alerts.push(format!("Very high UV: {uv} (protection required)"));
        }
    }

    alerts
}
