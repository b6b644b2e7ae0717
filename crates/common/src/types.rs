//! Plain domain records shared across the fetch and dispatch pipelines.
//!
//! These are deliberately behavior-light: matching and rendering live in
//! the `alerting` crate, persistence behind the traits in [`crate::store`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::grid::{Coordinate, GridCell};

/// How a notification decides whether to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertMode {
    /// Fires every day at the configured time.
    Daily,
    /// Fires when the observed condition matches a configured tag set,
    /// or when severe weather is detected.
    WeatherType,
    /// Fires when the temperature drops to a configured threshold.
    Temperature,
}

impl AlertMode {
    pub fn label(&self) -> &'static str {
        match self {
            AlertMode::Daily => "Daily briefing",
            AlertMode::WeatherType => "Weather condition alert",
            AlertMode::Temperature => "Temperature alert",
        }
    }
}

/// Which provider endpoints a fetch cycle should hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchMode {
    /// Short-range forecast fields only; skips cells already populated.
    Forecast,
    /// Now-cast observation fields; updates today's row in place.
    Current,
    /// Both of the above.
    Comprehensive,
}

/// Categorical weather condition derived from provider sky/precipitation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    LightRain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
    Fog,
    Wind,
}

impl WeatherCondition {
    /// Stable tag used in user preference lists and storage.
    pub fn tag(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "CLEAR",
            WeatherCondition::PartlyCloudy => "PARTLY_CLOUDY",
            WeatherCondition::Cloudy => "CLOUDY",
            WeatherCondition::LightRain => "LIGHT_RAIN",
            WeatherCondition::HeavyRain => "HEAVY_RAIN",
            WeatherCondition::Snow => "SNOW",
            WeatherCondition::Sleet => "SLEET",
            WeatherCondition::Thunderstorm => "THUNDERSTORM",
            WeatherCondition::Fog => "FOG",
            WeatherCondition::Wind => "WIND",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "CLEAR" => Some(WeatherCondition::Clear),
            "PARTLY_CLOUDY" => Some(WeatherCondition::PartlyCloudy),
            "CLOUDY" => Some(WeatherCondition::Cloudy),
            "LIGHT_RAIN" => Some(WeatherCondition::LightRain),
            "HEAVY_RAIN" => Some(WeatherCondition::HeavyRain),
            "SNOW" => Some(WeatherCondition::Snow),
            "SLEET" => Some(WeatherCondition::Sleet),
            "THUNDERSTORM" => Some(WeatherCondition::Thunderstorm),
            "FOG" => Some(WeatherCondition::Fog),
            "WIND" => Some(WeatherCondition::Wind),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "clear",
            WeatherCondition::PartlyCloudy => "partly cloudy",
            WeatherCondition::Cloudy => "overcast",
            WeatherCondition::LightRain => "light rain",
            WeatherCondition::HeavyRain => "heavy rain",
            WeatherCondition::Snow => "snow",
            WeatherCondition::Sleet => "sleet",
            WeatherCondition::Thunderstorm => "thunderstorm",
            WeatherCondition::Fog => "fog",
            WeatherCondition::Wind => "strong wind",
        }
    }
}

/// Overall classification used for the message header icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherStatus {
    Good,
    Caution,
    Alert,
}

impl WeatherStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            WeatherStatus::Good => "🌤️",
            WeatherStatus::Caution => "⚠️",
            WeatherStatus::Alert => "🚨",
        }
    }
}

/// A user's registered notification preference.
///
/// Owned by exactly one user; soft deletion is modelled with `deleted_at`
/// so the stores can filter without physical removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub id: u64,
    pub user_id: u64,
    pub webhook_url: String,
    pub address: String,
    pub coordinate: Option<Coordinate>,
    pub enabled: bool,
    pub notify_at: NaiveTime,
    pub mode: AlertMode,
    /// Comma-separated condition tags, only meaningful for `WeatherType`.
    pub weather_types: Option<String>,
    /// Degrees Celsius, only meaningful for `Temperature`.
    pub temperature_threshold: Option<i32>,
    #[serde(default)]
    pub deleted_at: Option<NaiveDateTime>,
}

impl NotificationPreference {
    pub fn is_active(&self) -> bool {
        self.enabled && self.deleted_at.is_none()
    }

    /// Parsed condition tag set, empty when none configured.
    pub fn weather_type_tags(&self) -> Vec<WeatherCondition> {
        self.weather_types
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .filter_map(WeatherCondition::from_tag)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The grid cell this preference resolves to, if geocoding succeeded.
    pub fn grid_cell(&self) -> Option<GridCell> {
        self.coordinate.map(|c| c.grid())
    }
}

/// One fetched weather row per (grid cell, calendar date).
///
/// Forecast fields are written once per day; the `current_*` now-cast
/// overlay is refreshed in place by later fetch cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub user_id: u64,
    pub date: NaiveDate,
    pub coordinate: Coordinate,
    pub cell: GridCell,

    // Short-range forecast.
    pub temperature: Option<f64>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub humidity: Option<i32>,
    pub condition: Option<WeatherCondition>,
    pub precipitation: Option<f64>,
    pub precipitation_probability: Option<i32>,
    pub wind_speed: Option<f64>,
    pub sky_code: Option<i32>,
    pub precipitation_code: Option<i32>,
    pub visibility_km: Option<f64>,
    pub uv_index: Option<i32>,
    pub air_pressure: Option<f64>,
    pub lightning: Option<f64>,

    // Now-cast overlay.
    pub current_temperature: Option<f64>,
    pub current_humidity: Option<i32>,
    pub current_wind_speed: Option<f64>,
    pub current_wind_direction: Option<i32>,
    pub current_precipitation: Option<f64>,
    pub current_precipitation_type: Option<String>,
    pub has_current_data: bool,
}

impl WeatherSnapshot {
    /// An empty snapshot for the given key; field values filled in by the
    /// fetch job as readings are parsed.
    pub fn new(user_id: u64, date: NaiveDate, coordinate: Coordinate, cell: GridCell) -> Self {
        Self {
            user_id,
            date,
            coordinate,
            cell,
            temperature: None,
            temperature_min: None,
            temperature_max: None,
            humidity: None,
            condition: None,
            precipitation: None,
            precipitation_probability: None,
            wind_speed: None,
            sky_code: None,
            precipitation_code: None,
            visibility_km: None,
            uv_index: None,
            air_pressure: None,
            lightning: None,
            current_temperature: None,
            current_humidity: None,
            current_wind_speed: None,
            current_wind_direction: None,
            current_precipitation: None,
            current_precipitation_type: None,
            has_current_data: false,
        }
    }

    /// Best-available temperature: now-cast value when present, else forecast.
    pub fn current_temp(&self) -> Option<f64> {
        self.current_temperature.or(self.temperature)
    }

    pub fn current_humidity_value(&self) -> Option<i32> {
        self.current_humidity.or(self.humidity)
    }

    pub fn current_wind(&self) -> Option<f64> {
        self.current_wind_speed.or(self.wind_speed)
    }

    /// Whether precipitation is currently observed on the now-cast overlay.
    pub fn has_active_precipitation(&self) -> bool {
        if self.current_precipitation.map(|p| p > 0.0) == Some(true) {
            return true;
        }
        matches!(
            self.current_precipitation_type.as_deref(),
            Some(code) if !code.is_empty() && code != "0"
        )
    }

    /// Fold a now-cast overlay from another fetch into this row.
    pub fn merge_current(&mut self, other: &WeatherSnapshot) {
        if other.current_temperature.is_some() {
            self.current_temperature = other.current_temperature;
        }
        if other.current_humidity.is_some() {
            self.current_humidity = other.current_humidity;
        }
        if other.current_wind_speed.is_some() {
            self.current_wind_speed = other.current_wind_speed;
        }
        if other.current_wind_direction.is_some() {
            self.current_wind_direction = other.current_wind_direction;
        }
        if other.current_precipitation.is_some() {
            self.current_precipitation = other.current_precipitation;
        }
        if other.current_precipitation_type.is_some() {
            self.current_precipitation_type = other.current_precipitation_type.clone();
        }
        self.has_current_data = self.has_current_data || other.has_current_data;
    }
}
