//! Configuration loader: merges env vars, .env file, and config.toml.

use std::path::Path;

use chrono::NaiveTime;
use serde::Deserialize;

use common::grid::Coordinate;
use common::types::{AlertMode, NotificationPreference};
use common::{Error, Result};

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Provider API key; normally supplied via `KMA_SERVICE_KEY`.
    pub service_key: String,
    /// Override for the provider endpoint, mainly for tests.
    pub provider_base_url: Option<String>,
    pub dispatch: DispatchConfig,
    pub notifications: Vec<NotificationEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_key: String::new(),
            provider_base_url: None,
            dispatch: DispatchConfig::default(),
            notifications: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Items per writer chunk.
    pub chunk_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::jobs::dispatch::DEFAULT_CHUNK_SIZE,
        }
    }
}

/// One registered notification, as written in `[[notifications]]`.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationEntry {
    pub webhook_url: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// "HH:MM", defaults to 07:00.
    #[serde(default = "default_notify_at")]
    pub notify_at: String,
    #[serde(default = "default_mode")]
    pub mode: AlertMode,
    pub weather_types: Option<String>,
    pub temperature_threshold: Option<i32>,
}

fn default_enabled() -> bool {
    true
}

fn default_notify_at() -> String {
    "07:00".to_string()
}

fn default_mode() -> AlertMode {
    AlertMode::Daily
}

impl NotificationEntry {
    fn into_preference(self, id: u64) -> Result<NotificationPreference> {
        let coordinate = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)?),
            (None, None) => None,
            _ => {
                return Err(Error::Config(format!(
                    "notification '{}' must set both latitude and longitude or neither",
                    self.address
                )))
            }
        };
        let notify_at = NaiveTime::parse_from_str(&self.notify_at, "%H:%M").map_err(|_| {
            Error::Config(format!(
                "notification '{}' has invalid notify_at '{}', expected HH:MM",
                self.address, self.notify_at
            ))
        })?;

        Ok(NotificationPreference {
            id,
            user_id: id,
            webhook_url: self.webhook_url,
            address: self.address,
            coordinate,
            enabled: self.enabled,
            notify_at,
            mode: self.mode,
            weather_types: self.weather_types,
            temperature_threshold: self.temperature_threshold,
            deleted_at: None,
        })
    }
}

fn validate_config(config: &AppConfig) -> Result<()> {
    let mut issues: Vec<String> = Vec::new();

    if config.service_key.trim().is_empty() {
        issues.push("KMA_SERVICE_KEY (or service_key) must be set".into());
    }
    if config.dispatch.chunk_size == 0 {
        issues.push("dispatch.chunk_size must be > 0".into());
    }
    if config.notifications.is_empty() {
        issues.push("notifications must contain at least one entry".into());
    }
    for entry in &config.notifications {
        if !slack_client::validate_webhook_url(&entry.webhook_url) {
            issues.push(format!(
                "notification '{}' has an invalid Slack webhook url",
                entry.address
            ));
        }
        if let (Some(lat), Some(lon)) = (entry.latitude, entry.longitude) {
            match Coordinate::new(lat, lon) {
                Ok(coord) if !coord.in_service_area() => issues.push(format!(
                    "notification '{}' is outside the provider service area",
                    entry.address
                )),
                Err(e) => issues.push(format!("notification '{}': {e}", entry.address)),
                _ => {}
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load service configuration from environment and optional config file.
pub fn load_config() -> Result<AppConfig> {
    // 1. Load .env from the project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = AppConfig::default();

    // 3. Merge config.toml if present.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {e}")))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {e}")))?;
    }

    // 4. Environment overrides win.
    if let Ok(key) = std::env::var("KMA_SERVICE_KEY") {
        config.service_key = key;
    }
    if let Ok(url) = std::env::var("KMA_BASE_URL") {
        config.provider_base_url = Some(url);
    }

    validate_config(&config)?;
    Ok(config)
}

/// Convert validated config entries into preference records.
pub fn seed_preferences(config: &AppConfig) -> Result<Vec<NotificationPreference>> {
    config
        .notifications
        .iter()
        .cloned()
        .enumerate()
        .map(|(idx, entry)| entry.into_preference(idx as u64 + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry() -> NotificationEntry {
        NotificationEntry {
            webhook_url: "https://hooks.slack.com/services/T0000000/B0000000/XXXXXXXXXXXXXXXX"
                .into(),
            address: "Seoul City Hall".into(),
            latitude: Some(37.5635694),
            longitude: Some(126.980008),
            enabled: true,
            notify_at: "07:00".into(),
            mode: AlertMode::Daily,
            weather_types: None,
            temperature_threshold: None,
        }
    }

    #[test]
    fn entry_converts_to_preference() {
        let pref = make_entry().into_preference(1).unwrap();
        assert_eq!(pref.notify_at, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(pref.grid_cell().unwrap().gx, 60);
    }

    #[test]
    fn entry_rejects_half_coordinate() {
        let mut entry = make_entry();
        entry.longitude = None;
        assert!(entry.into_preference(1).is_err());
    }

    #[test]
    fn entry_rejects_bad_time() {
        let mut entry = make_entry();
        entry.notify_at = "7 o'clock".into();
        assert!(entry.into_preference(1).is_err());
    }

    #[test]
    fn validation_collects_issues() {
        let config = AppConfig {
            service_key: String::new(),
            provider_base_url: None,
            dispatch: DispatchConfig { chunk_size: 0 },
            notifications: vec![NotificationEntry {
                webhook_url: "https://example.com/nope".into(),
                ..make_entry()
            }],
        };
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("KMA_SERVICE_KEY"));
        assert!(err.contains("chunk_size"));
        assert!(err.contains("webhook"));
    }

    #[test]
    fn toml_round_trip() {
        let raw = r#"
            service_key = "secret"

            [dispatch]
            chunk_size = 5

            [[notifications]]
            webhook_url = "https://hooks.slack.com/services/T0000000/B0000000/XXXXXXXXXXXXXXXX"
            address = "Seoul City Hall"
            latitude = 37.5635694
            longitude = 126.980008
            mode = "TEMPERATURE"
            temperature_threshold = 5
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.dispatch.chunk_size, 5);
        assert!(validate_config(&config).is_ok());
        let prefs = seed_preferences(&config).unwrap();
        assert_eq!(prefs[0].mode, AlertMode::Temperature);
        assert_eq!(prefs[0].temperature_threshold, Some(5));
    }
}
