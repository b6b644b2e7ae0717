//! Fixed-cadence scheduling for the fetch and dispatch jobs.
//!
//! Cadences mirror the provider's publication schedule: forecast fetches
//! fifteen minutes after each publication hour, now-cast refreshes every
//! half hour during waking hours, dispatch on the hour. Next-tick
//! computation is pure; the loops only sleep and invoke jobs.

use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::{error, info};

use common::types::FetchMode;

use crate::config::AppConfig;
use crate::jobs::{dispatch, fetch};
use crate::store::{MemoryNotificationStore, MemoryWeatherStore};
use kma_client::KmaClient;
use slack_client::SlackClient;

/// Forecast publication hours, fetched at :15.
const FETCH_HOURS: [u32; 8] = [2, 5, 8, 11, 14, 17, 20, 23];
/// Now-cast refresh window (inclusive hours).
const NOWCAST_FIRST_HOUR: u32 = 8;
const NOWCAST_LAST_HOUR: u32 = 22;

fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default())
}

/// Next forecast-fetch tick strictly after `now`.
pub fn next_forecast_run(now: NaiveDateTime) -> NaiveDateTime {
    for &hour in &FETCH_HOURS {
        let tick = at(now.date(), hour, 15);
        if tick > now {
            return tick;
        }
    }
    at(now.date() + Duration::days(1), FETCH_HOURS[0], 15)
}

/// Next now-cast refresh tick strictly after `now`: every half hour
/// between 08:00 and 22:30.
pub fn next_nowcast_run(now: NaiveDateTime) -> NaiveDateTime {
    for hour in NOWCAST_FIRST_HOUR..=NOWCAST_LAST_HOUR {
        for minute in [0, 30] {
            let tick = at(now.date(), hour, minute);
            if tick > now {
                return tick;
            }
        }
    }
    at(now.date() + Duration::days(1), NOWCAST_FIRST_HOUR, 0)
}

/// Next dispatch tick strictly after `now`: the top of the next hour.
pub fn next_dispatch_run(now: NaiveDateTime) -> NaiveDateTime {
    at(now.date(), now.hour(), 0) + Duration::hours(1)
}

async fn sleep_until(tick: NaiveDateTime) {
    let now = Local::now().naive_local();
    let wait = (tick - now).to_std().unwrap_or_default();
    tokio::time::sleep(wait).await;
}

/// Shared handles for the scheduled loops.
pub struct Scheduler {
    pub notifications: Arc<MemoryNotificationStore>,
    pub weather: Arc<MemoryWeatherStore>,
    pub source: Arc<KmaClient>,
    pub sink: Arc<SlackClient>,
    pub chunk_size: usize,
}

impl Scheduler {
    pub fn new(
        config: &AppConfig,
        notifications: Arc<MemoryNotificationStore>,
        weather: Arc<MemoryWeatherStore>,
        source: Arc<KmaClient>,
        sink: Arc<SlackClient>,
    ) -> Self {
        Self {
            notifications,
            weather,
            source,
            sink,
            chunk_size: config.dispatch.chunk_size,
        }
    }

    /// Run all three loops until shutdown.
    pub async fn run(self) {
        let forecast = {
            let notifications = Arc::clone(&self.notifications);
            let weather = Arc::clone(&self.weather);
            let source = Arc::clone(&self.source);
            tokio::spawn(async move {
                loop {
                    let tick = next_forecast_run(Local::now().naive_local());
                    info!(%tick, "next forecast fetch");
                    sleep_until(tick).await;
                    if let Err(e) = fetch::run(
                        notifications.as_ref(),
                        weather.as_ref(),
                        source.as_ref(),
                        FetchMode::Forecast,
                        Local::now().naive_local(),
                    )
                    .await
                    {
                        error!("forecast fetch job failed: {e}");
                    }
                }
            })
        };

        let nowcast = {
            let notifications = Arc::clone(&self.notifications);
            let weather = Arc::clone(&self.weather);
            let source = Arc::clone(&self.source);
            tokio::spawn(async move {
                loop {
                    let tick = next_nowcast_run(Local::now().naive_local());
                    info!(%tick, "next now-cast refresh");
                    sleep_until(tick).await;
                    if let Err(e) = fetch::run(
                        notifications.as_ref(),
                        weather.as_ref(),
                        source.as_ref(),
                        FetchMode::Current,
                        Local::now().naive_local(),
                    )
                    .await
                    {
                        error!("now-cast refresh job failed: {e}");
                    }
                }
            })
        };

        let dispatcher = {
            let notifications = Arc::clone(&self.notifications);
            let weather = Arc::clone(&self.weather);
            let sink = Arc::clone(&self.sink);
            let chunk_size = self.chunk_size;
            tokio::spawn(async move {
                loop {
                    let tick = next_dispatch_run(Local::now().naive_local());
                    info!(%tick, "next dispatch");
                    sleep_until(tick).await;
                    let now = Local::now().naive_local();
                    if let Err(e) = dispatch::run(
                        notifications.as_ref(),
                        weather.as_ref(),
                        sink.as_ref(),
                        truncate_to_minute(now.time()),
                        now.date(),
                        chunk_size,
                    )
                    .await
                    {
                        error!("dispatch job failed: {e}");
                    }
                }
            })
        };

        // The loops never return; park until one panics or we are aborted.
        let _ = tokio::join!(forecast, nowcast, dispatcher);
    }
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or_default()
}
