//! Daily aggregation
//!
//! This module turns a flat activity list into per-day summaries:
//! - Event-date grouping (logged `date_local`, else the viewer's local date)
//! - Nap vs night-sleep classification against the configured night window
//! - Sleep durations, wake windows, feed intervals and capped feed volume
//!
//! Raw tallies always count every activity. Statistics (durations, wake
//! windows, intervals, volume) skip sleeps with missing or contradictory times
//! and anything logged after the reference instant.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::normalizer::total_feed_volume;
use crate::time::{calculate_duration_minutes, is_daytime_nap, local_minutes, parse_time_to_minutes};
use crate::types::{Activity, ActivityDetails, DailySummary, DiaperType, SleepKind, SleepSegment};

/// Longest plausible daytime nap (minutes); longer ones are treated as mislogged
pub const MAX_NAP_MINUTES: u32 = 6 * 60;

/// Longest plausible night sleep (minutes)
pub const MAX_NIGHT_MINUTES: u32 = 14 * 60;

/// Local hours that bound the overnight sleep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightWindow {
    /// Hour night sleep begins (default 19)
    pub start_hour: u32,
    /// Hour night sleep ends (default 7)
    pub end_hour: u32,
}

impl Default for NightWindow {
    fn default() -> Self {
        Self {
            start_hour: 19,
            end_hour: 7,
        }
    }
}

impl NightWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }
}

/// Authoritative calendar date of an activity in the viewer's timezone
pub fn event_date<Tz: TimeZone>(activity: &Activity, tz: &Tz) -> NaiveDate {
    activity
        .date_local
        .unwrap_or_else(|| activity.logged_at.with_timezone(tz).date_naive())
}

/// Group activities by event date, preserving input order within a day
pub fn group_by_date<'a, Tz: TimeZone>(
    activities: &'a [Activity],
    tz: &Tz,
) -> BTreeMap<NaiveDate, Vec<&'a Activity>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&'a Activity>> = BTreeMap::new();
    for activity in activities {
        by_date
            .entry(event_date(activity, tz))
            .or_default()
            .push(activity);
    }
    by_date
}

/// Aggregate activities into one summary per event date, sorted by date
pub fn aggregate_by_day<Tz: TimeZone>(
    activities: &[Activity],
    night_window: &NightWindow,
    tz: &Tz,
    now: DateTime<Utc>,
) -> Vec<DailySummary> {
    let summaries: Vec<DailySummary> = group_by_date(activities, tz)
        .into_iter()
        .map(|(date, day)| summarize_day(Some(date), &day, night_window, tz, now))
        .collect();

    debug!(
        activities = activities.len(),
        days = summaries.len(),
        "aggregated activity history"
    );
    summaries
}

/// Fold all given activities into a single summary dated with the latest event date
pub fn aggregate_daily_summary<Tz: TimeZone>(
    activities: &[Activity],
    night_window: &NightWindow,
    tz: &Tz,
    now: DateTime<Utc>,
) -> DailySummary {
    let date = activities.iter().map(|a| event_date(a, tz)).max();
    let day: Vec<&Activity> = activities.iter().collect();
    summarize_day(date, &day, night_window, tz, now)
}

/// Summarize one day's activities
pub fn summarize_day<Tz: TimeZone>(
    date: Option<NaiveDate>,
    day: &[&Activity],
    night_window: &NightWindow,
    tz: &Tz,
    now: DateTime<Utc>,
) -> DailySummary {
    let mut summary = DailySummary {
        date,
        ..Default::default()
    };
    let mut measurable_feeds: Vec<&Activity> = Vec::new();

    for &activity in day {
        let future = activity.logged_at > now;
        if future {
            summary.future_dated += 1;
            trace!(id = %activity.id, "future-dated activity excluded from statistics");
        }

        match &activity.details {
            ActivityDetails::Feed(_) => {
                summary.feed_count += 1;
                if !future {
                    summary
                        .feed_times
                        .push(local_minutes(&activity.logged_at.with_timezone(tz)));
                    measurable_feeds.push(activity);
                }
            }
            ActivityDetails::Nap(nap) => {
                let kind = classify_sleep(activity, night_window, tz);
                match kind {
                    SleepKind::Nap => summary.nap_count += 1,
                    SleepKind::Night => summary.night_sleep_count += 1,
                }

                let segment = if future {
                    None
                } else {
                    measure_sleep(nap.start_time.as_deref(), nap.end_time.as_deref(), kind)
                };
                match segment {
                    Some(segment) => match kind {
                        SleepKind::Nap => {
                            summary.day_sleep_minutes += segment.duration_minutes;
                            summary.nap_segments.push(segment);
                        }
                        SleepKind::Night => {
                            summary.night_sleep_minutes += segment.duration_minutes;
                            summary.night_segments.push(segment);
                        }
                    },
                    None => {
                        summary.excluded_sleeps += 1;
                        trace!(id = %activity.id, "sleep excluded from duration statistics");
                    }
                }
            }
            ActivityDetails::Diaper(diaper) => {
                summary.diaper_count += 1;
                match diaper.diaper_type {
                    Some(DiaperType::Wet) => summary.wet_count += 1,
                    Some(DiaperType::Dirty) => summary.dirty_count += 1,
                    Some(DiaperType::Both) => {
                        summary.wet_count += 1;
                        summary.dirty_count += 1;
                    }
                    Some(DiaperType::Dry) | None => {}
                }
                if diaper.has_leak {
                    summary.leak_count += 1;
                }
            }
            ActivityDetails::Solids => summary.solids_count += 1,
            ActivityDetails::Note | ActivityDetails::Photo => {}
        }
    }

    summary.nap_segments.sort_by_key(|s| s.start);
    summary.night_segments.sort_by_key(|s| s.start);
    summary.feed_times.sort_unstable();

    summary.wake_windows = compute_wake_windows(&summary.nap_segments);
    summary.feed_intervals = compute_feed_intervals(&summary.feed_times);
    summary.feed_volume = total_feed_volume(measurable_feeds.iter().copied());

    summary
}

/// Nap or night sleep: an explicit night flag wins, otherwise the start hour
/// is tested against the night window
pub fn classify_sleep<Tz: TimeZone>(
    activity: &Activity,
    night_window: &NightWindow,
    tz: &Tz,
) -> SleepKind {
    let flagged = activity.as_nap().and_then(|nap| nap.is_night_sleep);
    match flagged {
        Some(true) => SleepKind::Night,
        Some(false) => SleepKind::Nap,
        None if is_daytime_nap(activity, night_window.start_hour, night_window.end_hour, tz) => {
            SleepKind::Nap
        }
        None => SleepKind::Night,
    }
}

/// Measure a sleep from its logged clock strings.
///
/// Returns `None` when either time is missing or unparseable, when the
/// duration is zero, or when the wrapped duration is implausible for the kind
/// (an end logged before the start).
pub fn measure_sleep(
    start: Option<&str>,
    end: Option<&str>,
    kind: SleepKind,
) -> Option<SleepSegment> {
    let start = parse_time_to_minutes(start?)?;
    let end = parse_time_to_minutes(end?)?;
    let duration_minutes = calculate_duration_minutes(start, end);

    let limit = match kind {
        SleepKind::Nap => MAX_NAP_MINUTES,
        SleepKind::Night => MAX_NIGHT_MINUTES,
    };
    if duration_minutes == 0 || duration_minutes > limit {
        return None;
    }

    Some(SleepSegment {
        start,
        end,
        duration_minutes,
        kind,
    })
}

/// Gaps between consecutive naps. Overlapping or midnight-crossing pairs are skipped.
pub fn compute_wake_windows(naps: &[SleepSegment]) -> Vec<u32> {
    naps.windows(2)
        .filter_map(|pair| {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.crosses_midnight() || next.start < prev.end {
                return None;
            }
            let gap = next.start - prev.end;
            (gap > 0).then_some(gap)
        })
        .collect()
}

/// Gaps between consecutive feed times, ignoring duplicates logged in the same minute
pub fn compute_feed_intervals(feed_times: &[u32]) -> Vec<u32> {
    feed_times
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|gap| *gap > 0)
        .collect()
}

/// Time the baby woke this morning, in minutes since midnight.
///
/// Candidates are yesterday's night sleeps that crossed midnight and today's
/// night sleeps that ended before noon; the latest end wins.
pub fn morning_wake(today: Option<&DailySummary>, yesterday: Option<&DailySummary>) -> Option<u32> {
    let carried = yesterday
        .into_iter()
        .flat_map(|s| s.night_segments.iter())
        .filter(|seg| seg.crosses_midnight())
        .map(|seg| seg.end);
    let same_day = today
        .into_iter()
        .flat_map(|s| s.night_segments.iter())
        .filter(|seg| !seg.crosses_midnight() && seg.end < 12 * 60)
        .map(|seg| seg.end);

    carried.chain(same_day).filter(|end| *end < 12 * 60).max()
}

/// Bedtime of a day: start of the evening night sleep, past-midnight starts
/// reported above 1440
pub fn bedtime(summary: &DailySummary) -> Option<u32> {
    summary
        .night_segments
        .iter()
        .filter_map(|seg| match seg.start {
            start if start >= 12 * 60 => Some(start),
            start if start < 4 * 60 => Some(start + 1440),
            _ => None,
        })
        .min()
}
