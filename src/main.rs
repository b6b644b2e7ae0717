//! weather-alarm service entry point.
//!
//! Runs the scheduler by default; `fetch-once` and `dispatch-once`
//! trigger a single job cycle for manual or administrative use.

mod config;
mod jobs;
mod scheduler;
mod store;

use std::sync::Arc;

use chrono::{Local, NaiveTime, Timelike};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::types::FetchMode;
use common::{Error, Result};
use kma_client::KmaClient;
use slack_client::SlackClient;

use crate::jobs::{dispatch, fetch};
use crate::scheduler::Scheduler;
use crate::store::{MemoryNotificationStore, MemoryWeatherStore};

#[derive(Parser)]
#[command(name = "weather-alarm", about = "Weather alert notification service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single weather fetch cycle and exit.
    FetchOnce {
        /// forecast, current, or comprehensive.
        #[arg(long, default_value = "forecast")]
        mode: String,
    },
    /// Run a single dispatch cycle and exit.
    DispatchOnce {
        /// Target time-of-day as HH:MM; defaults to the current minute.
        #[arg(long)]
        at: Option<String>,
    },
}

fn parse_fetch_mode(raw: &str) -> Result<FetchMode> {
    match raw.to_ascii_lowercase().as_str() {
        "forecast" => Ok(FetchMode::Forecast),
        "current" => Ok(FetchMode::Current),
        "comprehensive" => Ok(FetchMode::Comprehensive),
        other => Err(Error::Config(format!(
            "unknown fetch mode '{other}', expected forecast|current|comprehensive"
        ))),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("weather_alarm=info,kma_client=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config()?;

    let preferences = config::seed_preferences(&config)?;
    let notifications = Arc::new(MemoryNotificationStore::new(preferences));
    info!(notifications = notifications.len(), "configuration loaded");
    let weather = Arc::new(MemoryWeatherStore::new());
    let source = Arc::new(match &config.provider_base_url {
        Some(url) => KmaClient::with_base_url(&config.service_key, url)?,
        None => KmaClient::new(&config.service_key)?,
    });
    let sink = Arc::new(SlackClient::new()?);

    match cli.command {
        Some(Command::FetchOnce { mode }) => {
            let mode = parse_fetch_mode(&mode)?;
            let report = fetch::run(
                notifications.as_ref(),
                weather.as_ref(),
                source.as_ref(),
                mode,
                Local::now().naive_local(),
            )
            .await?;
            info!(
                success = report.success,
                skipped = report.skipped,
                errors = report.errors,
                "fetch cycle done"
            );
        }
        Some(Command::DispatchOnce { at }) => {
            let target = match at {
                Some(raw) => NaiveTime::parse_from_str(&raw, "%H:%M").map_err(|_| {
                    Error::Config(format!("invalid --at '{raw}', expected HH:MM"))
                })?,
                None => {
                    let now = Local::now().time();
                    NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or_default()
                }
            };
            let report = dispatch::run(
                notifications.as_ref(),
                weather.as_ref(),
                sink.as_ref(),
                target,
                Local::now().date_naive(),
                config.dispatch.chunk_size,
            )
            .await?;
            info!(
                read = report.read,
                matched = report.matched,
                sent = report.sent,
                failed = report.failed,
                skipped = report.skipped_no_weather,
                "dispatch cycle done"
            );
        }
        None => {
            let scheduler = Scheduler::new(&config, notifications, weather, source, sink);
            info!("starting scheduler loops");
            tokio::select! {
                _ = scheduler.run() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received, exiting");
                }
            }
        }
    }

    Ok(())
}
