//! Renders a (preference, snapshot) pair into multi-section Slack text.
//!
//! Rendering is side-effect free and tolerant of missing fields: a line
//! whose value is absent is simply omitted.

use common::types::{AlertMode, NotificationPreference, WeatherCondition, WeatherSnapshot};

use crate::matcher;

/// Build the full outbound message for one notification.
pub fn render(pref: &NotificationPreference, snapshot: &WeatherSnapshot) -> String {
    let mut out = String::new();

    append_header(&mut out, pref, snapshot);
    if matcher::is_severe(snapshot) {
        append_emergency_alerts(&mut out, snapshot);
    }
    append_conditional_alert(&mut out, pref, snapshot);
    append_current_conditions(&mut out, snapshot);
    append_today_forecast(&mut out, snapshot);
    append_details(&mut out, snapshot);
    append_recommendations(&mut out, snapshot);

    out
}

fn append_header(out: &mut String, pref: &NotificationPreference, snapshot: &WeatherSnapshot) {
    let icon = matcher::overall_status(snapshot).icon();
    let date = snapshot.date.format("%b %d");
    out.push_str(&format!(
        "{icon} *{} {}* ({date})\n\n",
        pref.address,
        pref.mode.label()
    ));
}

fn append_emergency_alerts(out: &mut String, snapshot: &WeatherSnapshot) {
    let alerts = matcher::severe_alert_lines(snapshot);
    if alerts.is_empty() {
        return;
    }
    out.push_str("🚨 *Severe weather alert!* 🚨\n");
    for alert in alerts {
        out.push_str(&format!("• {alert}\n"));
    }
    out.push('\n');
}

fn append_conditional_alert(
    out: &mut String,
    pref: &NotificationPreference,
    snapshot: &WeatherSnapshot,
) {
    let line = match pref.mode {
        AlertMode::Temperature => temperature_alert_line(pref, snapshot),
        AlertMode::WeatherType => weather_type_alert_line(pref, snapshot),
        AlertMode::Daily => None,
    };
    if let Some(line) = line {
        out.push_str(&line);
        out.push_str("\n\n");
    }
}

fn temperature_alert_line(
    pref: &NotificationPreference,
    snapshot: &WeatherSnapshot,
) -> Option<String> {
    let threshold = pref.temperature_threshold?;
    let temp = snapshot.current_temp()?;
    (temp <= f64::from(threshold)).then(|| {
        format!(
            "🌡️ *Temperature alert*: at or below your {threshold}°C threshold (now {}°C)",
            temp as i32
        )
    })
}

fn weather_type_alert_line(
    pref: &NotificationPreference,
    snapshot: &WeatherSnapshot,
) -> Option<String> {
    let tags = pref.weather_type_tags();
    if tags.is_empty() {
        return None;
    }
    let condition = snapshot.condition?;
    tags.contains(&condition).then(|| {
        format!(
            "☁️ *Weather alert*: your configured condition ({}) was detected!",
            condition.description()
        )
    })
}

fn append_current_conditions(out: &mut String, snapshot: &WeatherSnapshot) {
    out.push_str("📊 *Current conditions*\n");

    if let Some(temp) = snapshot.current_temp() {
        out.push_str(&format!("🌡️ Temperature: {}°C", temp as i32));
        if let Some(feels) = feels_like(snapshot) {
            if (feels - temp).abs() > 2.0 {
                out.push_str(&format!(" (feels like {}°C)", feels as i32));
            }
        }
        out.push('\n');
    }

    if let Some(humidity) = snapshot.current_humidity_value() {
        out.push_str(&format!(
            "💧 Humidity: {humidity}% ({})\n",
            humidity_comfort_label(humidity)
        ));
    }

    if let Some(wind) = snapshot.current_wind() {
        out.push_str(&format!("💨 Wind: {wind}m/s"));
        if let Some(direction) = wind_direction_label(snapshot.current_wind_direction) {
            out.push_str(&format!(" {direction}"));
        }
        out.push_str(&format!(" ({})", wind_strength_label(wind)));
        out.push('\n');
    }

    if snapshot.has_active_precipitation() {
        if let Some(rain) = snapshot.current_precipitation {
            out.push_str(&format!("🌧️ Precipitation now: {rain}mm/h"));
            if let Some(kind) = snapshot
                .current_precipitation_type
                .as_deref()
                .map(precipitation_type_label)
            {
                out.push_str(&format!(" ({kind})"));
            }
            out.push('\n');
        }
    }

    out.push('\n');
}

fn append_today_forecast(out: &mut String, snapshot: &WeatherSnapshot) {
    out.push_str("📋 *Today's forecast*\n");

    if snapshot.temperature_min.is_some() || snapshot.temperature_max.is_some() {
        out.push_str("🌡️ Range: ");
        if let Some(min) = snapshot.temperature_min {
            out.push_str(&format!("low {}°C", min as i32));
        }
        if snapshot.temperature_min.is_some() && snapshot.temperature_max.is_some() {
            out.push_str(" / ");
        }
        if let Some(max) = snapshot.temperature_max {
            out.push_str(&format!("high {}°C", max as i32));
        }
        out.push('\n');
    }

    if let Some(text) = forecast_condition_text(snapshot) {
        out.push_str(&format!("☁️ Weather: {text}\n"));
    }

    if let Some(prob) = snapshot.precipitation_probability {
        out.push_str(&format!("☔ Chance of precipitation: {prob}%"));
        if let Some(amount) = snapshot.precipitation {
            if amount > 0.0 {
                out.push_str(&format!(" (expected {amount}mm)"));
            }
        }
        out.push('\n');
    }

    out.push('\n');
}

fn forecast_condition_text(snapshot: &WeatherSnapshot) -> Option<String> {
    let sky = sky_description(snapshot.sky_code);
    let precip = snapshot
        .precipitation_code
        .filter(|&code| code != 0)
        .map(precipitation_code_label);

    if let Some(precip) = precip {
        let emoji = precipitation_emoji(snapshot.precipitation_code);
        let sky_info = sky.map(|s| format!(" ({s})")).unwrap_or_default();
        return Some(format!("{emoji} {precip}{sky_info}"));
    }
    if let Some(sky) = sky {
        return Some(format!("{} {sky}", sky_emoji(snapshot.sky_code)));
    }
    snapshot
        .condition
        .map(|c| format!("{} {}", condition_emoji(c), c.description()))
}

fn append_details(out: &mut String, snapshot: &WeatherSnapshot) {
    let mut items = Vec::new();

    if let Some(visibility) = snapshot.visibility_km {
        items.push(format!("👁️ Visibility: {visibility}km"));
    }
    if let Some(uv) = snapshot.uv_index {
        items.push(format!("☀️ UV index: {uv} ({})", uv_level_label(uv)));
    }
    if let Some(pressure) = snapshot.air_pressure {
        items.push(format!("📊 Pressure: {pressure}hPa"));
    }
    if let Some(lightning) = snapshot.lightning {
        if lightning > 0.0 {
            items.push(format!("⚡ Lightning intensity: {lightning}kA/㎢"));
        }
    }

    if items.is_empty() {
        return;
    }
    out.push_str("🔍 *Details*\n");
    for item in items {
        out.push_str(&item);
        out.push('\n');
    }
    out.push('\n');
}

fn append_recommendations(out: &mut String, snapshot: &WeatherSnapshot) {
    let recommendations = recommendations(snapshot);
    if recommendations.is_empty() {
        return;
    }
    out.push_str("💡 *Recommendations*\n");
    for rec in recommendations {
        out.push_str(&rec);
        out.push('\n');
    }
}

/// Apparent temperature: wind chill for cold windy readings, a simple
/// heat-index bump for hot humid ones.
pub fn feels_like(snapshot: &WeatherSnapshot) -> Option<f64> {
    let temp = snapshot.current_temp()?;
    let Some(wind) = snapshot.current_wind() else {
        return Some(temp);
    };

    if temp <= 10.0 && wind >= 4.8 {
        let kmh = (wind * 3.6).powf(0.16);
        Some(13.12 + 0.6215 * temp - 11.37 * kmh + 0.3965 * temp * kmh)
    } else if temp >= 27.0 {
        let humidity = snapshot.current_humidity_value().unwrap_or(50);
        Some(temp + f64::from(humidity - 40) * 0.1)
    } else {
        Some(temp)
    }
}

/// Per-factor advice lines, independent rules joined into one list.
pub fn recommendations(snapshot: &WeatherSnapshot) -> Vec<String> {
    let mut recs = Vec::new();

    if matcher::is_good_outdoor(snapshot) {
        recs.push("✨ Great weather to be outside!".to_string());
    } else if matcher::is_severe(snapshot) {
        recs.push("⚠️ Dangerous weather. Take extra care if you go out!".to_string());
    }

    if let Some(rec) = temperature_recommendation(snapshot) {
        recs.push(rec);
    }
    if let Some(rec) = precipitation_recommendation(snapshot) {
        recs.push(rec);
    }
    if let Some(rec) = wind_recommendation(snapshot) {
        recs.push(rec);
    }
    if let Some(rec) = humidity_recommendation(snapshot) {
        recs.push(rec);
    }
    if let Some(rec) = uv_recommendation(snapshot) {
        recs.push(rec);
    }
    if snapshot.lightning.map(|l| l > 0.0) == Some(true) {
        recs.push("⚡ Lightning expected. Stay away from open areas and seek shelter.".to_string());
    }

    recs
}

fn temperature_recommendation(snapshot: &WeatherSnapshot) -> Option<String> {
    let temp = feels_like(snapshot).or(snapshot.current_temp())?;
    let advice = if temp <= -10.0 {
        "🧥 Heavy winter coat, gloves, and a scarf are a must"
    } else if temp <= 0.0 {
        "🧥 Bundle up with a thick coat and winter gear"
    } else if temp <= 5.0 {
        "🧥 Wear a warm coat"
    } else if temp <= 10.0 {
        "🧥 Bring a light jacket or cardigan"
    } else if temp <= 19.0 {
        "👔 Long sleeves or a thin outer layer works well"
    } else if temp <= 24.0 {
        "👕 Short sleeves or thin long sleeves are comfortable"
    } else if temp <= 29.0 {
        "👕 Light summer clothing is best"
    } else if temp <= 34.0 {
        "🧴 Dress light and bring sunscreen"
    } else {
        "🚨 Extreme heat. Limit outdoor activity and stay hydrated"
    };
    Some(advice.to_string())
}

fn precipitation_recommendation(snapshot: &WeatherSnapshot) -> Option<String> {
    if snapshot.has_active_precipitation() {
        let rain = snapshot.current_precipitation?;
        let advice = if rain >= 50.0 {
            "🚨 Torrential rain! Stay indoors if possible".to_string()
        } else if rain >= 20.0 {
            "☂️ Heavy rain falling. Take an umbrella and rain gear".to_string()
        } else {
            "☂️ Take an umbrella".to_string()
        };
        return Some(advice);
    }

    let prob = snapshot.precipitation_probability.unwrap_or(0);
    if prob >= 70 {
        Some(format!("☂️ Take an umbrella ({prob}% chance of rain)"))
    } else if prob >= 40 {
        Some(format!("☂️ Keep a folding umbrella handy ({prob}% chance of rain)"))
    } else {
        None
    }
}

fn wind_recommendation(snapshot: &WeatherSnapshot) -> Option<String> {
    let wind = snapshot.current_wind()?;
    if wind >= 21.0 {
        Some("🚨 Very strong wind! Stay indoors and secure loose objects".to_string())
    } else if wind >= 14.0 {
        Some("💨 Strong wind. Watch hats and light items".to_string())
    } else if wind >= 9.0 {
        Some("💨 Fairly windy. Light clothing may be a nuisance".to_string())
    } else {
        None
    }
}

fn humidity_recommendation(snapshot: &WeatherSnapshot) -> Option<String> {
    let humidity = snapshot.current_humidity_value()?;
    let advice = if humidity < 20 {
        "💧 Extremely dry. Drink plenty of water and moisturize"
    } else if humidity < 30 {
        "💧 Dry air. Hydrate and use moisturizer"
    } else if humidity < 40 {
        "💧 Slightly dry. Keep up your water intake"
    } else if humidity <= 60 {
        "😊 Comfortable humidity"
    } else if humidity <= 70 {
        "🌫️ A bit humid"
    } else if humidity <= 80 {
        "🌫️ Humid. Keep rooms ventilated"
    } else {
        "🌫️ Very humid. Expect some discomfort"
    };
    Some(advice.to_string())
}

fn uv_recommendation(snapshot: &WeatherSnapshot) -> Option<String> {
    let uv = snapshot.uv_index?;
    if uv >= 11 {
        Some("🚨 Extreme UV! Avoid going outside if you can".to_string())
    } else if uv >= 8 {
        Some("🕶️ Very strong UV. Sunscreen, hat, and sunglasses required".to_string())
    } else if uv >= 6 {
        Some("🧴 Strong UV. Sunscreen recommended".to_string())
    } else if uv >= 3 {
        Some("☀️ Moderate UV. Mind long exposure".to_string())
    } else {
        None
    }
}

// ── Labels ────────────────────────────────────────────────────────────

/// Compass octant for a wind direction in degrees.
pub fn wind_direction_label(degrees: Option<i32>) -> Option<&'static str> {
    let d = degrees?;
    Some(match d {
        0..=22 | 338..=360 => "N",
        23..=67 => "NE",
        68..=112 => "E",
        113..=157 => "SE",
        158..=202 => "S",
        203..=247 => "SW",
        248..=292 => "W",
        293..=337 => "NW",
        _ => "?",
    })
}

pub fn wind_strength_label(speed: f64) -> &'static str {
    if speed < 4.0 {
        "light"
    } else if speed < 9.0 {
        "moderate"
    } else if speed < 14.0 {
        "strong"
    } else {
        "very strong"
    }
}

fn humidity_comfort_label(humidity: i32) -> &'static str {
    if humidity < 40 {
        "dry"
    } else if humidity > 60 {
        "humid"
    } else {
        "comfortable"
    }
}

fn uv_level_label(uv: i32) -> &'static str {
    if uv <= 2 {
        "low"
    } else if uv <= 5 {
        "moderate"
    } else if uv <= 7 {
        "high"
    } else if uv <= 10 {
        "very high"
    } else {
        "extreme"
    }
}

fn sky_description(sky_code: Option<i32>) -> Option<&'static str> {
    match sky_code? {
        1 => Some("clear"),
        3 => Some("mostly cloudy"),
        4 => Some("overcast"),
        _ => None,
    }
}

fn precipitation_code_label(code: i32) -> &'static str {
    match code {
        1 => "rain",
        2 => "rain and snow",
        3 => "snow",
        4 => "showers",
        _ => "precipitation",
    }
}

fn precipitation_type_label(code: &str) -> &'static str {
    match code {
        "1" => "rain",
        "2" => "rain and snow",
        "3" => "snow",
        "4" => "showers",
        _ => "precipitation",
    }
}

fn sky_emoji(sky_code: Option<i32>) -> &'static str {
    match sky_code {
        Some(1) => "☀️",
        Some(3) => "⛅",
        Some(4) => "☁️",
        _ => "🌤️",
    }
}

fn precipitation_emoji(code: Option<i32>) -> &'static str {
    match code {
        Some(1) => "🌧️",
        Some(2) => "🌨️",
        Some(3) => "❄️",
        Some(4) => "⛈️",
        _ => "🌦️",
    }
}

fn condition_emoji(condition: WeatherCondition) -> &'static str {
    match condition {
        WeatherCondition::Clear => "☀️",
        WeatherCondition::PartlyCloudy => "⛅",
        WeatherCondition::Cloudy => "☁️",
        WeatherCondition::LightRain => "🌦️",
        WeatherCondition::HeavyRain => "🌧️",
        WeatherCondition::Snow | WeatherCondition::Sleet => "🌨️",
        WeatherCondition::Thunderstorm => "⛈️",
        WeatherCondition::Fog => "🌫️",
        WeatherCondition::Wind => "💨",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use common::grid::Coordinate;

    fn make_snapshot() -> WeatherSnapshot {
        let coord = Coordinate::new(37.5635694, 126.980008).unwrap();
        WeatherSnapshot::new(1, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), coord, coord.grid())
    }

    fn make_preference(mode: AlertMode) -> NotificationPreference {
        NotificationPreference {
            id: 1,
            user_id: 1,
            webhook_url: "https://hooks.slack.com/services/T000/B000/x".into(),
            address: "Seoul".into(),
            coordinate: Coordinate::new(37.5635694, 126.980008).ok(),
            enabled: true,
            notify_at: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            mode,
            weather_types: None,
            temperature_threshold: None,
            deleted_at: None,
        }
    }

    #[test]
    fn renders_header_for_empty_snapshot() {
        // Must never fail even with every optional field missing.
        let text = render(&make_preference(AlertMode::Daily), &make_snapshot());
        assert!(text.contains("Seoul"));
        assert!(text.contains("Daily briefing"));
        assert!(text.contains("May 01"));
        assert!(!text.contains("Temperature:"));
    }

    #[test]
    fn severe_snapshot_gets_emergency_block() {
        let mut snap = make_snapshot();
        snap.precipitation_probability = Some(85);
        let text = render(&make_preference(AlertMode::Daily), &snap);
        assert!(text.starts_with("🚨"));
        assert!(text.contains("Severe weather alert"));
        assert!(text.contains("High chance of precipitation: 85%"));
    }

    #[test]
    fn temperature_breach_line_included() {
        let mut pref = make_preference(AlertMode::Temperature);
        pref.temperature_threshold = Some(5);
        let mut snap = make_snapshot();
        snap.current_temperature = Some(3.0);
        let text = render(&pref, &snap);
        assert!(text.contains("Temperature alert"));
        assert!(text.contains("5°C threshold"));
    }

    #[test]
    fn matched_weather_type_line_included() {
        let mut pref = make_preference(AlertMode::WeatherType);
        pref.weather_types = Some("SNOW".into());
        let mut snap = make_snapshot();
        snap.condition = Some(WeatherCondition::Snow);
        let text = render(&pref, &snap);
        assert!(text.contains("Weather alert"));
        assert!(text.contains("snow"));
    }

    #[test]
    fn current_block_shows_feels_like_on_large_gap() {
        let mut snap = make_snapshot();
        snap.current_temperature = Some(2.0);
        snap.current_wind_speed = Some(8.0);
        snap.current_humidity = Some(50);
        let text = render(&make_preference(AlertMode::Daily), &snap);
        assert!(text.contains("feels like"));
        assert!(text.contains("Humidity: 50% (comfortable)"));
    }

    #[test]
    fn forecast_block_prefers_precipitation_over_sky() {
        let mut snap = make_snapshot();
        snap.temperature_min = Some(11.0);
        snap.temperature_max = Some(22.0);
        snap.sky_code = Some(1);
        snap.precipitation_code = Some(3);
        snap.precipitation_probability = Some(80);
        let text = render(&make_preference(AlertMode::Daily), &snap);
        assert!(text.contains("low 11°C / high 22°C"));
        assert!(text.contains("❄️ snow (clear)"));
        assert!(text.contains("Chance of precipitation: 80%"));
    }

    #[test]
    fn wind_chill_formula() {
        let mut snap = make_snapshot();
        snap.current_temperature = Some(0.0);
        snap.current_wind_speed = Some(10.0);
        let feels = feels_like(&snap).unwrap();
        // 13.12 - 11.37 * 36^0.16 at 0°C.
        assert!(feels < -5.0 && feels > -8.0, "unexpected wind chill {feels}");
    }

    #[test]
    fn heat_index_uses_humidity() {
        let mut snap = make_snapshot();
        snap.current_temperature = Some(30.0);
        snap.current_wind_speed = Some(2.0);
        snap.current_humidity = Some(80);
        assert_eq!(feels_like(&snap), Some(34.0));
    }

    #[test]
    fn feels_like_without_wind_is_plain_temperature() {
        let mut snap = make_snapshot();
        snap.current_temperature = Some(5.0);
        assert_eq!(feels_like(&snap), Some(5.0));
    }

    #[test]
    fn wind_direction_octants() {
        assert_eq!(wind_direction_label(Some(0)), Some("N"));
        assert_eq!(wind_direction_label(Some(45)), Some("NE"));
        assert_eq!(wind_direction_label(Some(180)), Some("S"));
        assert_eq!(wind_direction_label(Some(350)), Some("N"));
        assert_eq!(wind_direction_label(None), None);
    }

    #[test]
    fn good_day_recommendation_present() {
        let mut snap = make_snapshot();
        snap.temperature = Some(20.0);
        snap.wind_speed = Some(3.0);
        snap.precipitation_probability = Some(10);
        snap.condition = Some(WeatherCondition::Clear);
        let recs = recommendations(&snap);
        assert!(recs.iter().any(|r| r.contains("Great weather")));
    }
}
