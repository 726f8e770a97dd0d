//! Schedule reconciliation
//!
//! Lines a predicted day up against what was actually logged. Each predicted
//! event is matched to the nearest unused logged event of the same kind within
//! a tolerance, and the schedule's accuracy is scored over the events whose
//! predicted time has already passed.

use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use crate::features::{aggregate_by_day, bedtime, morning_wake, NightWindow};
use crate::time::{format_minutes_to_time, local_minutes};
use crate::types::{Activity, DailySummary, PredictedSchedule, ScheduleEventType};

/// Largest prediction error (minutes) still counted as a match
pub const MATCH_TOLERANCE_MINUTES: u32 = 45;

/// A logged occurrence a prediction can be matched to
#[derive(Debug, Clone, Copy)]
struct Actual {
    minutes: u32,
    duration: Option<u32>,
    used: bool,
}

impl Actual {
    fn at(minutes: u32) -> Self {
        Self {
            minutes,
            duration: None,
            used: false,
        }
    }
}

fn actuals_for(
    event_type: ScheduleEventType,
    today: Option<&DailySummary>,
    yesterday: Option<&DailySummary>,
) -> Vec<Actual> {
    match event_type {
        ScheduleEventType::Feed => today
            .map(|s| s.feed_times.iter().map(|&t| Actual::at(t)).collect())
            .unwrap_or_default(),
        ScheduleEventType::Nap => today
            .map(|s| {
                s.nap_segments
                    .iter()
                    .map(|seg| Actual {
                        duration: Some(seg.duration_minutes),
                        ..Actual::at(seg.start)
                    })
                    .collect()
            })
            .unwrap_or_default(),
        ScheduleEventType::Wake => morning_wake(today, yesterday)
            .map(Actual::at)
            .into_iter()
            .collect(),
        ScheduleEventType::Bed => today
            .and_then(bedtime)
            .filter(|b| *b < 1440)
            .map(Actual::at)
            .into_iter()
            .collect(),
    }
}

/// Fill in actual times and score a predicted schedule against logged activity.
///
/// `now` fixes both the viewer's timezone and which predicted events count as
/// passed. Events predicted for a later time are left unscored. A passed event
/// with no logged counterpart scores zero.
pub fn reconcile_schedule<Tz: TimeZone>(
    mut schedule: PredictedSchedule,
    activities: &[Activity],
    night_window: &NightWindow,
    now: &DateTime<Tz>,
) -> PredictedSchedule {
    let tz = now.timezone();
    let now_utc = now.with_timezone(&Utc);
    let summaries = aggregate_by_day(activities, night_window, &tz, now_utc);
    let today = summaries.iter().find(|s| s.date == Some(schedule.date));
    let yesterday = summaries
        .iter()
        .find(|s| s.date.is_some() && s.date == schedule.date.pred_opt());

    let local_date = now.date_naive();
    let passed_before = if schedule.date < local_date {
        Some(u32::MAX)
    } else if schedule.date == local_date {
        Some(local_minutes(now))
    } else {
        None
    };

    let mut pools: Vec<(ScheduleEventType, Vec<Actual>)> = [
        ScheduleEventType::Wake,
        ScheduleEventType::Nap,
        ScheduleEventType::Feed,
        ScheduleEventType::Bed,
    ]
    .into_iter()
    .map(|t| (t, actuals_for(t, today, yesterday)))
    .collect();

    let mut scores = Vec::new();
    for event in &mut schedule.events {
        let Some((_, pool)) = pools.iter_mut().find(|(t, _)| *t == event.event_type) else {
            continue;
        };
        let nearest = pool
            .iter_mut()
            .filter(|a| !a.used && a.minutes.abs_diff(event.minutes) <= MATCH_TOLERANCE_MINUTES)
            .min_by_key(|a| a.minutes.abs_diff(event.minutes));

        let error = nearest.map(|actual| {
            actual.used = true;
            event.actual_time = Some(format_minutes_to_time(actual.minutes as i64, false));
            event.actual_duration = actual.duration;
            actual.minutes.abs_diff(event.minutes)
        });

        if passed_before.is_some_and(|cutoff| event.minutes <= cutoff) {
            let score = error
                .map(|e| 1.0 - e as f64 / MATCH_TOLERANCE_MINUTES as f64)
                .unwrap_or(0.0);
            scores.push(score);
        }
    }

    schedule.accuracy_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    debug!(
        date = %schedule.date,
        scored = scores.len(),
        accuracy = ?schedule.accuracy_score,
        "reconciled schedule"
    );
    schedule
}
