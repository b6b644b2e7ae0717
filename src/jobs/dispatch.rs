//! Notification dispatch job: a chunked reader/processor/writer pipeline
//! over the preferences scheduled for the current minute.

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info, warn};

use alerting::{matcher, message};
use common::grid::GridCell;
use common::store::{DispatchSink, NotificationStore, WeatherStore};
use common::types::{NotificationPreference, WeatherSnapshot};
use common::{Error, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Aggregate counts for one dispatch cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Preferences scheduled for the target minute.
    pub read: u32,
    /// Scheduled preferences with no snapshot (or no coordinate).
    pub skipped_no_weather: u32,
    /// Candidates whose alert condition held.
    pub matched: u32,
    pub sent: u32,
    pub failed: u32,
}

/// A read candidate carrying the matcher's verdict.
struct Candidate {
    pref: NotificationPreference,
    snapshot: WeatherSnapshot,
    should_send: bool,
}

/// A rendered, dispatch-ready item.
struct Outgoing {
    endpoint: String,
    message: String,
    notification_id: u64,
    user_id: u64,
}

/// Run one dispatch cycle for the given time-of-day and date.
///
/// Fails only when scheduled preferences cannot be enumerated; missing
/// snapshots and send failures are counted, never escalated.
pub async fn run(
    notifications: &dyn NotificationStore,
    weather: &dyn WeatherStore,
    sink: &dyn DispatchSink,
    target: NaiveTime,
    date: NaiveDate,
    chunk_size: usize,
) -> Result<DispatchReport> {
    let scheduled = notifications.find_enabled_at(target).await?;
    let mut report = DispatchReport {
        read: scheduled.len() as u32,
        ..DispatchReport::default()
    };
    info!(
        scheduled = scheduled.len(),
        target = %target.format("%H:%M"),
        "starting dispatch cycle"
    );

    // Reader: pair each scheduled preference with its weather row.
    let mut candidates = Vec::new();
    for pref in scheduled {
        let Some(cell) = pref.grid_cell() else {
            warn!(notification = pref.id, "no resolved coordinate, dropping");
            report.skipped_no_weather += 1;
            continue;
        };
        let snapshot = match load_snapshot(weather, cell, date).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(notification = pref.id, %cell, "no usable weather snapshot, dropping: {e}");
                report.skipped_no_weather += 1;
                continue;
            }
        };
        let should_send = matcher::should_alert(&pref, &snapshot);
        candidates.push(Candidate {
            pref,
            snapshot,
            should_send,
        });
    }

    // Processor: drop unmatched candidates, render the rest.
    let outgoing: Vec<Outgoing> = candidates
        .into_iter()
        .filter_map(|c| {
            if !c.should_send {
                debug!(notification = c.pref.id, "alert condition not met");
                return None;
            }
            let text = message::render(&c.pref, &c.snapshot);
            Some(Outgoing {
                endpoint: c.pref.webhook_url.clone(),
                message: text,
                notification_id: c.pref.id,
                user_id: c.pref.user_id,
            })
        })
        .collect();
    report.matched = outgoing.len() as u32;

    // Writer: bounded chunks, per-item failure isolation.
    for chunk in outgoing.chunks(chunk_size.max(1)) {
        for item in chunk {
            if sink.send(&item.endpoint, &item.message).await {
                debug!(
                    notification = item.notification_id,
                    user = item.user_id,
                    "notification delivered"
                );
                report.sent += 1;
            } else {
                warn!(
                    notification = item.notification_id,
                    user = item.user_id,
                    "notification send failed"
                );
                report.failed += 1;
            }
        }
    }

    info!(
        read = report.read,
        matched = report.matched,
        sent = report.sent,
        failed = report.failed,
        skipped = report.skipped_no_weather,
        "dispatch cycle finished"
    );
    Ok(report)
}

/// Looks up the snapshot a candidate depends on; a missing row is a
/// `NotFound` error the reader converts into a counted skip.
async fn load_snapshot(
    weather: &dyn WeatherStore,
    cell: GridCell,
    date: NaiveDate,
) -> Result<WeatherSnapshot> {
    weather
        .find(cell, date)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no weather snapshot for {cell} on {date}")))
}
