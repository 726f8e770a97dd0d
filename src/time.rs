//! Clock-time utilities
//!
//! Sleeps are logged as local 12-hour clock strings ("9:30 AM"), so most of the
//! engine works in minutes since local midnight. Everything here is modulo one
//! day: durations that cross midnight wrap instead of going negative.

use chrono::{DateTime, NaiveDate, Offset, TimeZone, Timelike};

use crate::types::Activity;

/// Minutes in one day
pub const MINUTES_PER_DAY: u32 = 1440;

/// Parse a clock string into minutes since midnight.
///
/// Accepts `H:MM AM/PM` (case-insensitive, space optional) and bare 24-hour
/// `HH:MM`. Returns `None` for anything else.
pub fn parse_time_to_minutes(s: &str) -> Option<u32> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let upper = trimmed.to_ascii_uppercase();
    let (clock, meridiem) = if let Some(rest) = upper.strip_suffix("AM") {
        (rest.trim_end(), Some(false))
    } else if let Some(rest) = upper.strip_suffix("PM") {
        (rest.trim_end(), Some(true))
    } else {
        (upper.as_str(), None)
    };

    let (hours, minutes) = clock.split_once(':')?;
    if minutes.len() != 2 || hours.is_empty() || hours.len() > 2 {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if minutes >= 60 {
        return None;
    }

    let hours = match meridiem {
        Some(is_pm) => {
            if !(1..=12).contains(&hours) {
                return None;
            }
            match (hours, is_pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            }
        }
        None => {
            if hours >= 24 {
                return None;
            }
            hours
        }
    };

    Some(hours * 60 + minutes)
}

/// Parse with the degenerate fallback: malformed input yields 0.
pub fn parse_time_to_minutes_or_zero(s: &str) -> u32 {
    parse_time_to_minutes(s).unwrap_or(0)
}

/// Wrap any minute count into `[0, 1440)`
pub fn normalize_minutes(minutes: i64) -> u32 {
    let day = MINUTES_PER_DAY as i64;
    (((minutes % day) + day) % day) as u32
}

/// Format minutes since midnight as `h:mm AM` (or `HH:MM` in 24-hour mode).
///
/// Out-of-range values are wrapped into the day first.
pub fn format_minutes_to_time(minutes: i64, use_24_hour: bool) -> String {
    let normalized = normalize_minutes(minutes);
    let hours = normalized / 60;
    let mins = normalized % 60;

    if use_24_hour {
        return format!("{:02}:{:02}", hours, mins);
    }

    let (display_hour, suffix) = match hours {
        0 => (12, "AM"),
        1..=11 => (hours, "AM"),
        12 => (12, "PM"),
        _ => (hours - 12, "PM"),
    };
    format!("{}:{:02} {}", display_hour, mins, suffix)
}

/// Minutes from `start` to `end`, wrapping across midnight. Always in `[0, 1440)`.
pub fn calculate_duration_minutes(start: u32, end: u32) -> u32 {
    normalize_minutes(end as i64 - start as i64)
}

/// Wraparound membership test for `[start, end)` on a 24-hour clock.
///
/// When `start > end` the range wraps midnight; when they are equal it is empty.
pub fn is_hour_in_range(hour: u32, start: u32, end: u32) -> bool {
    let hour = hour % 24;
    if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

/// Local start hour of a sleep activity: the logged start time when it parses,
/// otherwise the local hour it was logged at.
pub fn sleep_start_hour<Tz: TimeZone>(activity: &Activity, tz: &Tz) -> u32 {
    activity
        .as_nap()
        .and_then(|nap| nap.start_time.as_deref())
        .and_then(parse_time_to_minutes)
        .map(|minutes| minutes / 60)
        .unwrap_or_else(|| activity.logged_at.with_timezone(tz).hour())
}

/// Whether a sleep activity starts in the day portion `[night_end, night_start)`.
pub fn is_daytime_nap<Tz: TimeZone>(
    activity: &Activity,
    night_start_hour: u32,
    night_end_hour: u32,
    tz: &Tz,
) -> bool {
    is_hour_in_range(
        sleep_start_hour(activity, tz),
        night_end_hour,
        night_start_hour,
    )
}

/// Minutes since local midnight of an instant in the given timezone
pub fn local_minutes<Tz: TimeZone>(instant: &DateTime<Tz>) -> u32 {
    instant.hour() * 60 + instant.minute()
}

/// Whether the UTC offset changes during the given local day.
///
/// Days whose midnight or last second cannot be represented (a gap at
/// midnight) also count as transition days.
pub fn is_dst_transition_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> bool {
    let start = date
        .and_hms_opt(0, 0, 0)
        .and_then(|dt| tz.from_local_datetime(&dt).earliest());
    let end = date
        .and_hms_opt(23, 59, 59)
        .and_then(|dt| tz.from_local_datetime(&dt).latest());

    match (start, end) {
        (Some(start), Some(end)) => start.offset().fix() != end.offset().fix(),
        _ => true,
    }
}
